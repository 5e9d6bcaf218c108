//! # Patch Merge Service
//!
//! `POST .../merge_processes/patch` merges the outputs listed in `outputs`
//! from every mapset of `mapsetlist` into the mapset of the URL.
//!
//! ## Workflow:
//!
//! 1.  **Validation**: `MergePlan::from_request` splits the outputs by type and
//!     rejects empty or repeated names, duplicate source mapsets and a target
//!     listed among the sources. Unsupported output types are skipped.
//! 2.  **Scheduling**: the plan is handed to `enqueue_job`, which answers with
//!     the `accepted` status right away.
//! 3.  **Background Processing**: `run_patch_merge` patches rasters, vectors
//!     and space time raster datasets in a temporary environment, copies the
//!     results into the target and, unless `keep_mapsets` is set, deletes the
//!     source mapsets.

use crate::error::ProcessingError;
use crate::job_controller::{enqueue_job, JobsState};
use crate::processing::merge::run_patch_merge;
use crate::processing::outputs::MergePlan;
use crate::services::{apidocs, ProcessingState};
use actix_web::{web, HttpResponse};
use common::requests::PatchMergeRequest;
use log::info;

/// Handler for `POST .../merge_processes/patch`.
///
/// # Arguments
/// * `path` - Project and target mapset.
/// * `payload` - Source mapsets, outputs and the cleanup choice.
/// * `state` - Backend, job owner and job timeout.
/// * `jobs` - The job table the merge is registered in.
///
/// # Returns
/// `200 OK` with the `accepted` job status, or the validation error.
pub(crate) async fn process(
    path: web::Path<(String, String)>,
    payload: web::Json<PatchMergeRequest>,
    state: web::Data<ProcessingState>,
    jobs: web::Data<JobsState>,
) -> Result<HttpResponse, ProcessingError> {
    let (project, target) = path.into_inner();
    let plan = MergePlan::from_request(&target, &payload)?;
    info!(
        "Patch merge of {} mapsets into {project}/{target}: {} rasters, {} vectors, {} strds",
        plan.sources.len(),
        plan.rasters.len(),
        plan.vectors.len(),
        plan.strds.len()
    );

    let backend = state.backend.clone();
    let status = enqueue_job(&jobs, &state.user_id, state.job_timeout, move |sink| {
        run_patch_merge(&backend, &project, &target, &plan, sink)
    })
    .await;
    Ok(HttpResponse::Ok().json(status))
}

/// Handler for `GET .../merge_processes/patch`.
pub(crate) async fn describe() -> HttpResponse {
    HttpResponse::Ok().json(apidocs::patch_merge_post_docs())
}

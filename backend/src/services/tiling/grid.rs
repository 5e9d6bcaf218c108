//! # Grid Tiling Service
//!
//! `POST .../tiling_processes/grid` creates `<grid_prefix><index>` vector tiles
//! of `width` x `height` map units covering the current region of the mapset.
//!
//! ## Workflow:
//!
//! 1.  **Validation**: width and height must be positive numbers and the
//!     prefix must not be empty. Invalid requests are rejected with 400 before
//!     anything is queued.
//! 2.  **Scheduling**: the job is handed to `enqueue_job`, which answers with
//!     the `accepted` status right away.
//! 3.  **Background Processing**: `run_grid_tiling` locks the mapset, builds
//!     the grid in a temporary environment, extracts every cell into its own
//!     map and copies the tiles back. The tile names end up in the
//!     `process_results` of the finished job.

use crate::error::ProcessingError;
use crate::job_controller::{enqueue_job, JobsState};
use crate::processing::grid::{run_grid_tiling, GridTiling};
use crate::services::{apidocs, ProcessingState};
use actix_web::{web, HttpResponse};
use common::requests::GridTilingRequest;
use log::info;

/// Handler for `POST .../tiling_processes/grid`.
///
/// # Arguments
/// * `path` - Project and mapset receiving the tiles.
/// * `payload` - Cell width, height and tile name prefix.
/// * `state` - Backend, job owner and job timeout.
/// * `jobs` - The job table the tiling is registered in.
///
/// # Returns
/// `200 OK` with the `accepted` job status, or the validation error.
pub(crate) async fn process(
    path: web::Path<(String, String)>,
    payload: web::Json<GridTilingRequest>,
    state: web::Data<ProcessingState>,
    jobs: web::Data<JobsState>,
) -> Result<HttpResponse, ProcessingError> {
    let (project, mapset) = path.into_inner();
    let tiling = GridTiling::try_from(&payload.into_inner())?;
    info!(
        "Grid tiling of {project}/{mapset} with {}x{} tiles named {}*",
        tiling.width, tiling.height, tiling.prefix
    );

    let backend = state.backend.clone();
    let status = enqueue_job(&jobs, &state.user_id, state.job_timeout, move |sink| {
        run_grid_tiling(&backend, &project, &mapset, &tiling, sink)
    })
    .await;
    Ok(HttpResponse::Ok().json(status))
}

/// Handler for `GET .../tiling_processes/grid`.
pub(crate) async fn describe() -> HttpResponse {
    HttpResponse::Ok().json(apidocs::grid_tiling_post_docs())
}

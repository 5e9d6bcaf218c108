//! Patch merge: combine the per-tile outputs of several source mapsets into
//! one target mapset.
//!
//! Phases run in a fixed order, each taking the [`MergeContext`] explicitly:
//! series discovery, raster patching (including series members), vector
//! patching, series recreation, finalization and source removal. Series are
//! recreated only after their members were patched, and finalization only
//! runs once every pass succeeded.
//!
//! Series structure is read from the first source mapset only. All source
//! mapsets are expected to hold the same members; a member missing in one of
//! them makes its raster patch fail.

use super::outputs::{
    MergePlan, RASTER_STEPS, STRDS_DISCOVERY_STEPS, STRDS_RECREATION_STEPS, VECTOR_STEPS,
};
use super::strds::SeriesInfo;
use super::{lifecycle, JobOutput, ProcessingBackend, ProgressSink, ProgressTracker, Session};
use crate::error::{ProcessingError, Result};
use crate::process_chain::builders::{self, ATTRIBUTE_TABLE};
use crate::workspace::{WorkspaceManager, PERMANENT};
use log::{info, warn};
use std::path::Path;

/// Mutable state of one merge job.
#[derive(Clone, Debug, Default)]
pub struct MergeContext {
    pub progress: ProgressTracker,
    /// Rasters to patch: the requested ones followed by series members.
    pub rasters: Vec<String>,
    pub series: Vec<(String, SeriesInfo)>,
    /// Names of the outputs merged so far, in processing order.
    pub merged: Vec<String>,
    pub warnings: Vec<String>,
}

impl MergeContext {
    pub fn new(plan: &MergePlan) -> Self {
        Self {
            progress: ProgressTracker::new(plan.initial_steps()),
            rasters: plan.rasters.clone(),
            ..Self::default()
        }
    }
}

/// Read every requested series from the first source mapset and queue its
/// member rasters for patching.
pub fn discover_series(session: &Session<'_>, plan: &MergePlan, ctx: &mut MergeContext) -> Result<()> {
    let Some(first_source) = plan.sources.first() else {
        return Ok(());
    };
    for strds in &plan.strds {
        let results = session.run(&builders::list_strds(&format!("{strds}@{first_source}"))?)?;
        let info = SeriesInfo::from_module_results(&results)?;

        let mut discovered = 0;
        for raster in &info.rasters {
            if !ctx.rasters.iter().any(|r| r == raster.name()) {
                ctx.rasters.push(raster.name().to_string());
                discovered += 1;
            }
        }
        info!(
            "Series {strds} has {} rasters, {discovered} added to the patch list",
            info.rasters.len()
        );
        ctx.progress.extend(discovered * RASTER_STEPS);
        ctx.progress.advance(STRDS_DISCOVERY_STEPS);
        ctx.series.push((strds.clone(), info));
        session.report(&ctx.progress);
    }
    Ok(())
}

/// Patch every queued raster of all sources into the working mapset.
///
/// # Arguments
/// * `session` - Runs the chains in the prepared environment.
/// * `plan` - Supplies the source mapsets qualifying each raster name.
/// * `ctx` - Holds the queued rasters; every patched one is added to `merged`.
///
/// # Returns
/// The first failing chain aborts the pass with its error.
pub fn patch_rasters(session: &Session<'_>, plan: &MergePlan, ctx: &mut MergeContext) -> Result<()> {
    for raster in &ctx.rasters {
        session.run(&builders::patch_raster(&plan.qualified_sources(raster), raster)?)?;
        ctx.merged.push(raster.clone());
        ctx.progress.advance(RASTER_STEPS);
        session.report(&ctx.progress);
    }
    Ok(())
}

/// An empty first line of the connection check means no attribute table.
pub fn has_attribute_table(lines: &[String]) -> bool {
    lines.first().is_some_and(|line| !line.trim().is_empty())
}

/// Patch every requested vector of all sources into the working mapset.
///
/// A vector with a connected attribute table is patched with `-e`, so its
/// attributes are copied too.
///
/// # Arguments
/// * `session` - Runs the chains in the prepared environment.
/// * `plan` - Lists the vectors and the source mapsets.
/// * `ctx` - Every patched vector is added to `merged`.
pub fn patch_vectors(session: &Session<'_>, plan: &MergePlan, ctx: &mut MergeContext) -> Result<()> {
    for vector in &plan.vectors {
        let results = session.run(&builders::check_attribute_table(vector)?)?;
        let attribute_table = has_attribute_table(results.list(ATTRIBUTE_TABLE)?);
        session.run(&builders::patch_vector(
            &plan.qualified_sources(vector),
            vector,
            attribute_table,
        )?)?;
        ctx.merged.push(vector.clone());
        ctx.progress.advance(VECTOR_STEPS);
        session.report(&ctx.progress);
    }
    Ok(())
}

/// Create each series anew in the working mapset and register the patched
/// member rasters under their bare names.
pub fn recreate_series(session: &Session<'_>, tmp_workdir: &Path, ctx: &mut MergeContext) -> Result<()> {
    for (name, info) in &ctx.series {
        let file = info.write_registration_file(name, tmp_workdir)?;
        let register_file = file.path().to_string_lossy();
        session.run(&builders::create_strds(&info.definition(name), &register_file)?)?;
        // `file` is removed here, also when the chain failed above
        ctx.merged.push(name.clone());
        ctx.progress.advance(STRDS_RECREATION_STEPS);
        session.report(&ctx.progress);
    }
    Ok(())
}

/// Unlock, lock and delete a source mapset. Absent mapsets are fine.
fn delete_mapset(workspaces: &dyn WorkspaceManager, project: &str, mapset: &str) -> Result<()> {
    workspaces.unlock(project, mapset)?;
    workspaces.lock(project, mapset)?;
    let deleted = workspaces.delete(project, mapset);
    let unlocked = workspaces.unlock(project, mapset);
    deleted.and(unlocked)
}

/// Remove every source mapset except `PERMANENT`.
///
/// Runs only after finalization. Nothing is removed once the job was
/// cancelled.
///
/// # Arguments
/// * `sink` - Tells whether the job was cancelled.
/// * `workspaces` - Deletes the mapsets.
/// * `project` - The project holding the sources.
/// * `plan` - Lists the source mapsets.
/// * `ctx` - Deletion failures are appended to its `warnings`.
///
/// # Returns
/// `Cancelled` if the job was cancelled. Deletion failures never fail the job.
pub fn remove_sources(
    sink: &dyn ProgressSink,
    workspaces: &dyn WorkspaceManager,
    project: &str,
    plan: &MergePlan,
    ctx: &mut MergeContext,
) -> Result<()> {
    if sink.is_cancelled() {
        warn!("Keeping the source mapsets of {project}, the job was cancelled");
        return Err(ProcessingError::Cancelled(
            "removing the source mapsets".to_string(),
        ));
    }
    for mapset in plan.sources.iter().filter(|m| *m != PERMANENT) {
        if let Err(e) = delete_mapset(workspaces, project, mapset) {
            warn!("Unable to delete mapset {project}/{mapset}: {e}");
            ctx.warnings
                .push(format!("Unable to delete mapset <{mapset}>: {e}"));
        }
    }
    Ok(())
}

/// The patch merge job.
///
/// # Arguments
/// * `backend` - Executor, workspace manager and temporary directory.
/// * `project` - The project holding sources and target.
/// * `target` - The mapset receiving the merged outputs.
/// * `plan` - The validated sources, outputs and cleanup choice.
/// * `sink` - Receives progress and tells whether the job was cancelled.
///
/// # Returns
/// The merged output names and cleanup warnings. On error the target is left
/// untouched and no source is removed.
pub fn run_patch_merge(
    backend: &ProcessingBackend,
    project: &str,
    target: &str,
    plan: &MergePlan,
    sink: &dyn ProgressSink,
) -> Result<JobOutput> {
    let prepared = lifecycle::prepare(backend.workspaces.clone(), project, target, &plan.sources)?;
    let session = Session::new(backend.executor.as_ref(), prepared.environment(), sink);

    let mut ctx = MergeContext::new(plan);
    session.report(&ctx.progress);

    discover_series(&session, plan, &mut ctx)?;
    patch_rasters(&session, plan, &mut ctx)?;
    patch_vectors(&session, plan, &mut ctx)?;
    recreate_series(&session, &backend.tmp_workdir, &mut ctx)?;

    session.ensure_active("copying results into the target")?;
    prepared.finalize()?;
    info!("Merged {} outputs into {project}/{target}", ctx.merged.len());

    if !plan.keep_mapsets {
        remove_sources(sink, backend.workspaces.as_ref(), project, plan, &mut ctx)?;
    }

    Ok(JobOutput {
        process_results: ctx.merged,
        warnings: ctx.warnings,
    })
}

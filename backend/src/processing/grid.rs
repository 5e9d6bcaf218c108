//! Grid tiling: split the current region into equally sized vector tiles.

use super::{lifecycle, JobOutput, ProcessingBackend, ProgressSink, ProgressTracker, Session};
use crate::error::{ProcessingError, Result};
use crate::process_chain::builders::{self, GRID_INFO};
use common::requests::GridTilingRequest;
use log::{info, warn};
use uuid::Uuid;

/// Steps known before the cell count: grid creation, info and grid removal.
const FIXED_STEPS: u32 = 3;

/// A validated grid tiling request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridTiling {
    pub width: String,
    pub height: String,
    pub prefix: String,
}

fn positive_number(param: &str, value: &str) -> Result<String> {
    let value = value.trim();
    match value.parse::<f64>() {
        Ok(number) if number.is_finite() && number > 0.0 => Ok(value.to_string()),
        _ => Err(ProcessingError::invalid_value(
            param,
            format!("'{value}' is not a positive number"),
        )),
    }
}

impl TryFrom<&GridTilingRequest> for GridTiling {
    type Error = ProcessingError;

    fn try_from(request: &GridTilingRequest) -> Result<Self> {
        let prefix = request.grid_prefix.trim();
        if prefix.is_empty() {
            return Err(ProcessingError::invalid_value("grid_prefix", "must not be empty"));
        }
        Ok(Self {
            width: positive_number("width", &request.width)?,
            height: positive_number("height", &request.height)?,
            prefix: prefix.to_string(),
        })
    }
}

/// `<prefix><index>` for 1..=count, indices zero-padded to the digits of count.
pub fn tile_names(prefix: &str, count: usize) -> Vec<String> {
    let width = count.to_string().len();
    (1..=count)
        .map(|index| format!("{prefix}{index:0width$}"))
        .collect()
}

/// The tile count is the `centroids=<N>` line of `v.info -t`.
pub fn cell_count(info: &[String]) -> Result<usize> {
    let malformed = |reason: &str| ProcessingError::MalformedOutput {
        module: "v.info".to_string(),
        reason: reason.to_string(),
    };
    let value = info
        .iter()
        .filter_map(|line| line.split_once('='))
        .find(|(key, _)| key.trim() == "centroids")
        .map(|(_, value)| value.trim())
        .ok_or_else(|| malformed("no 'centroids' entry"))?;
    value
        .parse()
        .map_err(|_| malformed(&format!("centroids value '{value}' is not a count")))
}

/// Create the grid in the mapset, extract every cell and drop the grid.
pub fn run(
    session: &Session<'_>,
    tiling: &GridTiling,
    output: &mut JobOutput,
) -> Result<Vec<String>> {
    let mut tracker = ProgressTracker::new(FIXED_STEPS);
    let grid = format!("grid_{}", Uuid::new_v4().simple());

    session.run(&builders::create_grid(&grid, &tiling.width, &tiling.height)?)?;
    tracker.advance(1);
    session.report(&tracker);

    let results = session.run(&builders::grid_info(&grid)?)?;
    let count = cell_count(results.list(GRID_INFO)?)?;
    let cell_steps = u32::try_from(count).map_err(|_| ProcessingError::MalformedOutput {
        module: "v.info".to_string(),
        reason: format!("{count} cells exceed the number of trackable steps"),
    })?;
    tracker.extend(cell_steps);
    tracker.advance(1);
    session.report(&tracker);
    info!("Grid {grid} has {count} cells");

    let names = tile_names(&tiling.prefix, count);
    for (index, name) in names.iter().enumerate() {
        session.run(&builders::extract_grid_cell(&grid, index + 1, name)?)?;
        tracker.advance(1);
        session.report(&tracker);
    }

    if let Err(e) = session.run(&builders::remove_vector(&grid)?) {
        warn!("Unable to remove grid {grid}: {e}");
        output.warnings.push(format!("Unable to remove grid <{grid}>: {e}"));
    }
    tracker.advance(1);
    session.report(&tracker);

    Ok(names)
}

/// The grid tiling job: prepare the mapset, tile, copy the tiles back.
///
/// # Arguments
/// * `backend` - Executor and workspace manager.
/// * `project` - The project holding the mapset.
/// * `mapset` - The mapset receiving the tiles; created if missing.
/// * `tiling` - The validated cell size and tile name prefix.
/// * `sink` - Receives progress and tells whether the job was cancelled.
///
/// # Returns
/// The tile names and a warning if the grid could not be removed. A failed
/// or cancelled job copies nothing into the mapset.
pub fn run_grid_tiling(
    backend: &ProcessingBackend,
    project: &str,
    mapset: &str,
    tiling: &GridTiling,
    sink: &dyn ProgressSink,
) -> Result<JobOutput> {
    let prepared = lifecycle::prepare(backend.workspaces.clone(), project, mapset, &[])?;
    let session = Session::new(backend.executor.as_ref(), prepared.environment(), sink);

    let mut output = JobOutput::default();
    let names = run(&session, tiling, &mut output)?;
    output.process_results = names;
    session.ensure_active("copying the tiles into the mapset")?;
    prepared.finalize()?;
    Ok(output)
}

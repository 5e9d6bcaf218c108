use crate::error::{ProcessingError, Result};
use common::requests::PatchMergeRequest;
use log::info;
use std::collections::HashSet;

/// Data type of a requested merge output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputKind {
    Raster,
    Vector,
    /// Space time raster dataset.
    Strds,
    /// Space time vector dataset; accepted but not merged.
    Stvds,
    Unsupported(String),
}

impl From<&str> for OutputKind {
    fn from(param: &str) -> Self {
        match param {
            "raster" => Self::Raster,
            "vector" => Self::Vector,
            "strds" => Self::Strds,
            "stvds" => Self::Stvds,
            other => Self::Unsupported(other.to_string()),
        }
    }
}

/// Progress units consumed per merged output.
pub const RASTER_STEPS: u32 = 2;
pub const VECTOR_STEPS: u32 = 3;
pub const STRDS_DISCOVERY_STEPS: u32 = 3;
pub const STRDS_RECREATION_STEPS: u32 = 2;

/// A validated merge request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergePlan {
    pub sources: Vec<String>,
    pub rasters: Vec<String>,
    pub vectors: Vec<String>,
    pub strds: Vec<String>,
    pub keep_mapsets: bool,
}

impl MergePlan {
    /// Split the outputs by type and check the request invariants: a
    /// non-empty list of distinct source mapsets not containing the target,
    /// and every output name declared exactly once.
    pub fn from_request(target: &str, request: &PatchMergeRequest) -> Result<Self> {
        let mut plan = Self {
            keep_mapsets: request.keep_mapsets.keep(),
            ..Self::default()
        };

        if request.mapsetlist.is_empty() {
            return Err(ProcessingError::InvalidRequest(
                "'mapsetlist' must contain at least one mapset".to_string(),
            ));
        }
        let mut seen_mapsets = HashSet::new();
        for mapset in &request.mapsetlist {
            let mapset = mapset.trim();
            if mapset.is_empty() {
                return Err(ProcessingError::InvalidRequest(
                    "'mapsetlist' contains an empty mapset name".to_string(),
                ));
            }
            if mapset == target {
                return Err(ProcessingError::InvalidRequest(format!(
                    "the target mapset <{target}> must not be part of 'mapsetlist'"
                )));
            }
            if !seen_mapsets.insert(mapset) {
                return Err(ProcessingError::InvalidRequest(format!(
                    "mapset <{mapset}> is listed twice in 'mapsetlist'"
                )));
            }
            plan.sources.push(mapset.to_string());
        }

        let mut seen_names = HashSet::new();
        for output in &request.outputs {
            let names = match OutputKind::from(output.param.as_str()) {
                OutputKind::Raster => &mut plan.rasters,
                OutputKind::Vector => &mut plan.vectors,
                OutputKind::Strds => &mut plan.strds,
                OutputKind::Stvds => {
                    info!("Merging of stvds is not implemented, skipping '{}'", output.value);
                    continue;
                }
                OutputKind::Unsupported(param) => {
                    info!("Output type '{param}' not yet supported!");
                    continue;
                }
            };
            for name in output.value.split(',').map(str::trim) {
                if name.is_empty() {
                    return Err(ProcessingError::InvalidRequest(format!(
                        "empty map name in {} outputs",
                        output.param
                    )));
                }
                if !seen_names.insert(name.to_string()) {
                    return Err(ProcessingError::InvalidRequest(format!(
                        "output <{name}> is requested more than once"
                    )));
                }
                names.push(name.to_string());
            }
        }
        Ok(plan)
    }

    /// Upper bound of the work known before the series were read.
    pub fn initial_steps(&self) -> u32 {
        self.rasters.len() as u32 * RASTER_STEPS
            + self.vectors.len() as u32 * VECTOR_STEPS
            + self.strds.len() as u32 * (STRDS_DISCOVERY_STEPS + STRDS_RECREATION_STEPS)
    }

    /// `<name>@<source_1>,...,<name>@<source_n>`
    pub fn qualified_sources(&self, name: &str) -> String {
        self.sources
            .iter()
            .map(|mapset| format!("{name}@{mapset}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

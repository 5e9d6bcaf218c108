use serde::{Deserialize, Serialize};

/// Body of `POST .../tiling_processes/grid`.
///
/// Width and height are given in map units of the project.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GridTilingRequest {
    pub width: String,
    pub height: String,
    pub grid_prefix: String,
}

/// One `{param, value}` entry of the `outputs` list of a merge request.
///
/// `param` names the data type (`raster`, `vector`, `strds`, ...), `value` is a
/// comma separated list of map names of that type.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct OutputParameter {
    pub param: String,
    pub value: String,
}

/// `keep_mapsets` arrives either as JSON boolean or as string.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum KeepMapsets {
    Flag(bool),
    Text(String),
}

impl Default for KeepMapsets {
    fn default() -> Self {
        Self::Flag(false)
    }
}

impl KeepMapsets {
    /// Only `true` and a case-insensitive `"true"` keep the source mapsets.
    pub fn keep(&self) -> bool {
        match self {
            Self::Flag(flag) => *flag,
            Self::Text(text) => text.trim().eq_ignore_ascii_case("true"),
        }
    }
}

/// Body of `POST .../merge_processes/patch`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PatchMergeRequest {
    pub mapsetlist: Vec<String>,
    pub outputs: Vec<OutputParameter>,
    #[serde(default)]
    pub keep_mapsets: KeepMapsets,
}

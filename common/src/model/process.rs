use serde::{Deserialize, Serialize};

/// Entry of the tiling and merge process listings.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProcessDescription {
    pub id: String,
    pub categories: Vec<String>,
    pub description: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TilingListResponse {
    pub tiling_processes: Vec<ProcessDescription>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MergeListResponse {
    pub merge_processes: Vec<ProcessDescription>,
}

/// Body of every non-2xx response.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

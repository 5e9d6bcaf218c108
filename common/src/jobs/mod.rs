use serde::{Deserialize, Serialize};

/// Lifecycle state of a queued tiling or merge job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Registered in the job table, not yet picked up by a worker.
    Accepted,
    Running,
    Finished,
    Error,
    /// The job did not finish within the configured job timeout.
    Timeout,
}

impl JobState {
    /// `true` once no further updates are expected for the job.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Error | Self::Timeout)
    }
}

/// Completed and estimated total number of processing steps.
///
/// The total is refined while a job runs (series member rasters are only
/// known after their series was read), so it is an estimate that may grow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub step: u32,
    pub num_of_steps: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobUrls {
    pub status: String,
}

/// Machine readable error of a failed job.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobException {
    pub kind: String,
    pub message: String,
}

/// The status record returned when a job is enqueued and when it is polled.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub user_id: String,
    pub resource_id: String,
    pub status: JobState,
    pub message: String,
    pub progress: Progress,
    /// Names produced by the job: tile names or merged output names.
    pub process_results: Vec<String>,
    /// Non-fatal problems, e.g. source mapsets that could not be removed.
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<JobException>,
    pub urls: JobUrls,
}

impl JobStatus {
    pub fn accepted(user_id: &str, resource_id: &str, status_url: String) -> Self {
        Self {
            user_id: user_id.to_string(),
            resource_id: resource_id.to_string(),
            status: JobState::Accepted,
            message: "Resource accepted".to_string(),
            progress: Progress::default(),
            process_results: Vec::new(),
            warnings: Vec::new(),
            exception: None,
            urls: JobUrls { status: status_url },
        }
    }
}

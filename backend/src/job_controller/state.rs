//! Shared state of the queued tiling and merge jobs.
//!
//! - `JobsState`: clonable handle on the job table and the update channel. It
//!   is injected into the Actix application state in `main.rs`.
//! - `JobUpdate`: a message from a running job to the central updater.
//! - `start_job_updater`: the long-running task applying updates to the table.
//!
//! Once a job reached a terminal state (`finished`, `error`, `timeout`) all
//! further updates for it are dropped.

use crate::processing::JobOutput;
use common::jobs::{JobException, JobState, JobStatus, Progress};
use log::debug;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{mpsc, RwLock};

/// Capacity of the update channel between the workers and the updater.
pub const UPDATE_CHANNEL_CAPACITY: usize = 100;

/// Resource id to the latest status of the job.
pub type JobTable = Arc<RwLock<HashMap<String, JobStatus>>>;

/// A thread-safe, shareable container for the state of all jobs.
#[derive(Clone)]
pub struct JobsState {
    pub jobs: JobTable,
    /// Sender used by the workers to push `JobUpdate`s to the updater.
    pub tx: mpsc::Sender<JobUpdate>,
}

impl JobsState {
    /// Create an empty job table. The receiver must be handed to
    /// [`start_job_updater`].
    pub fn new() -> (Self, mpsc::Receiver<JobUpdate>) {
        let (tx, rx) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);
        let state = Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            tx,
        };
        (state, rx)
    }

    /// Status of a job owned by `user_id`.
    pub async fn status(&self, user_id: &str, resource_id: &str) -> Option<JobStatus> {
        self.jobs
            .read()
            .await
            .get(resource_id)
            .filter(|status| status.user_id == user_id)
            .cloned()
    }
}

/// What happened to a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Running,
    Progress(Progress),
    Finished(JobOutput),
    Failed { kind: String, message: String },
    TimedOut,
}

/// A status change of one job, sent by its worker.
#[derive(Debug)]
pub struct JobUpdate {
    pub(crate) resource_id: String,
    pub(crate) event: JobEvent,
}

impl JobUpdate {
    pub fn new(resource_id: &str, event: JobEvent) -> Self {
        Self {
            resource_id: resource_id.to_string(),
            event,
        }
    }
}

/// Apply an event to a status. Returns `false` if the job already ended.
pub fn apply_event(status: &mut JobStatus, event: JobEvent) -> bool {
    if status.status.is_terminal() {
        return false;
    }
    match event {
        JobEvent::Running => {
            status.status = JobState::Running;
            status.message = "Processing started".to_string();
        }
        JobEvent::Progress(progress) => {
            status.status = JobState::Running;
            status.progress = progress;
            status.message = format!(
                "Processing step {} of {}",
                progress.step, progress.num_of_steps
            );
        }
        JobEvent::Finished(output) => {
            status.status = JobState::Finished;
            status.message = "Processing successfully finished".to_string();
            status.progress.num_of_steps = status.progress.num_of_steps.max(status.progress.step);
            status.process_results = output.process_results;
            status.warnings = output.warnings;
        }
        JobEvent::Failed { kind, message } => {
            status.status = JobState::Error;
            status.message = message.clone();
            status.exception = Some(JobException { kind, message });
        }
        JobEvent::TimedOut => {
            status.status = JobState::Timeout;
            status.message = "Processing did not finish within the job timeout".to_string();
        }
    }
    true
}

/// Receive `JobUpdate`s and apply them to the job table until every sender
/// is gone.
pub async fn start_job_updater(jobs: JobTable, mut rx: mpsc::Receiver<JobUpdate>) {
    while let Some(update) = rx.recv().await {
        let mut jobs = jobs.write().await;
        match jobs.get_mut(&update.resource_id) {
            Some(status) => {
                if !apply_event(status, update.event) {
                    debug!("Ignoring update of finished job {}", update.resource_id);
                }
            }
            None => debug!("Ignoring update of unknown job {}", update.resource_id),
        }
    }
}

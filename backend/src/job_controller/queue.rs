//! Running jobs out of band.
//!
//! `enqueue_job` registers an `accepted` status, returns it right away and
//! spawns a Tokio task that runs the job on the blocking thread pool. The job
//! reports progress through a [`JobReporter`], which forwards it to the
//! central updater. A job exceeding the timeout is marked `timeout` and its
//! reporter is flagged as cancelled. The worker thread cannot be interrupted,
//! but it stops before its next process chain and never publishes results or
//! removes mapsets. Later updates of it are ignored.

use super::state::{JobEvent, JobUpdate, JobsState};
use crate::error::Result;
use crate::processing::{JobOutput, ProgressSink};
use common::jobs::{JobStatus, Progress};
use log::{error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Forwards the progress of one job from its worker thread to the updater.
pub struct JobReporter {
    resource_id: String,
    tx: mpsc::Sender<JobUpdate>,
    /// Set once the job exceeded its timeout.
    cancelled: Arc<AtomicBool>,
}

impl ProgressSink for JobReporter {
    fn report(&self, progress: Progress) {
        // Runs on the blocking pool, so `blocking_send` is fine here.
        if self
            .tx
            .blocking_send(JobUpdate::new(&self.resource_id, JobEvent::Progress(progress)))
            .is_err()
        {
            warn!("Job updater is gone, dropping progress of {}", self.resource_id);
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

pub fn status_url(user_id: &str, resource_id: &str) -> String {
    format!("/api/resources/{user_id}/{resource_id}")
}

/// Register a job for `user_id` and run `work` in the background.
///
/// # Arguments
/// * `state` - The job table and the channel to the updater.
/// * `user_id` - Owner of the job.
/// * `timeout` - Time after which the job is marked `timeout` and cancelled.
/// * `work` - The job, run on the blocking thread pool.
///
/// # Returns
/// The `accepted` status record, which doubles as the job handle.
pub async fn enqueue_job<F>(
    state: &JobsState,
    user_id: &str,
    timeout: Duration,
    work: F,
) -> JobStatus
where
    F: FnOnce(&dyn ProgressSink) -> Result<JobOutput> + Send + 'static,
{
    let resource_id = format!("resource_id-{}", Uuid::new_v4());
    let status = JobStatus::accepted(user_id, &resource_id, status_url(user_id, &resource_id));
    state
        .jobs
        .write()
        .await
        .insert(resource_id.clone(), status.clone());

    let tx = state.tx.clone();
    tokio::spawn(async move {
        let cancelled = Arc::new(AtomicBool::new(false));
        let reporter = JobReporter {
            resource_id: resource_id.clone(),
            tx: tx.clone(),
            cancelled: cancelled.clone(),
        };
        let _ = tx
            .send(JobUpdate::new(&resource_id, JobEvent::Running))
            .await;

        let handle = tokio::task::spawn_blocking(move || work(&reporter));

        let event = match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(Ok(output))) => {
                info!(
                    "Job {resource_id} finished with {} results",
                    output.process_results.len()
                );
                JobEvent::Finished(output)
            }
            Ok(Ok(Err(e))) => {
                error!("Job {resource_id} failed: {e}");
                JobEvent::Failed {
                    kind: e.kind().to_string(),
                    message: e.to_string(),
                }
            }
            Ok(Err(e)) => {
                error!("Job {resource_id} panicked or was cancelled: {e}");
                JobEvent::Failed {
                    kind: "Internal".to_string(),
                    message: format!("Task join error: {e}"),
                }
            }
            Err(_) => {
                error!("Job {resource_id} exceeded the timeout of {timeout:?}, cancelling it");
                cancelled.store(true, Ordering::SeqCst);
                JobEvent::TimedOut
            }
        };
        let _ = tx.send(JobUpdate::new(&resource_id, event)).await;
    });

    status
}

//! Background job queue and the job status table.

pub mod queue;
pub mod state;

pub use queue::enqueue_job;
pub use state::{start_job_updater, JobsState};

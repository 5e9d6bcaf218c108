//! The tiling and merge jobs.
//!
//! Every job runs on one blocking worker and executes strictly in order:
//! workspace preparation ([`lifecycle`]), the job specific passes ([`grid`] or
//! [`merge`]), finalization and, for merges, the optional removal of the
//! source mapsets. Progress is pushed to a [`ProgressSink`] after each phase.

pub mod grid;
pub mod lifecycle;
pub mod merge;
pub mod outputs;
pub mod strds;

use crate::engine::{GrassEnvironment, ProcessExecutor};
use crate::error::{ProcessingError, Result};
use crate::process_chain::{parse_module_outputs, ModuleResults, ProcessChain};
use crate::workspace::WorkspaceManager;
use common::jobs::Progress;
use log::warn;
use std::path::PathBuf;
use std::sync::Arc;

/// The collaborators shared by all jobs of the server.
#[derive(Clone)]
pub struct ProcessingBackend {
    pub executor: Arc<dyn ProcessExecutor>,
    pub workspaces: Arc<dyn WorkspaceManager>,
    /// Directory for registration files and temporary databases.
    pub tmp_workdir: PathBuf,
}

/// Receives progress updates of a running job.
pub trait ProgressSink {
    fn report(&self, progress: Progress);

    /// Whether the job should stop. A cancelled job must not publish results
    /// nor delete mapsets.
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// What a finished job hands back: its result names and non-fatal warnings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JobOutput {
    pub process_results: Vec<String>,
    pub warnings: Vec<String>,
}

/// Running step count against a total that may still grow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProgressTracker {
    completed: u32,
    total: u32,
}

impl ProgressTracker {
    pub fn new(total: u32) -> Self {
        Self {
            completed: 0,
            total,
        }
    }

    pub fn advance(&mut self, steps: u32) {
        self.completed += steps;
        self.total = self.total.max(self.completed);
    }

    /// Account for work discovered while running.
    pub fn extend(&mut self, steps: u32) {
        self.total += steps;
    }

    pub fn progress(&self) -> Progress {
        Progress {
            step: self.completed,
            num_of_steps: self.total,
        }
    }
}

/// Runs chains inside the prepared environment of one job.
pub struct Session<'a> {
    executor: &'a dyn ProcessExecutor,
    env: &'a GrassEnvironment,
    sink: &'a dyn ProgressSink,
}

impl<'a> Session<'a> {
    pub fn new(
        executor: &'a dyn ProcessExecutor,
        env: &'a GrassEnvironment,
        sink: &'a dyn ProgressSink,
    ) -> Self {
        Self {
            executor,
            env,
            sink,
        }
    }

    /// Fail with [`ProcessingError::Cancelled`] once the job was cancelled.
    ///
    /// # Arguments
    /// * `next` - The phase that would run next, used in the error message.
    pub fn ensure_active(&self, next: &str) -> Result<()> {
        if self.sink.is_cancelled() {
            warn!("Job in mapset {} cancelled before {next}", self.env.mapset);
            return Err(ProcessingError::Cancelled(next.to_string()));
        }
        Ok(())
    }

    /// Execute a chain and parse the stdout of its capturing steps.
    pub fn run(&self, chain: &ProcessChain) -> Result<ModuleResults> {
        self.ensure_active("running the next process chain")?;
        let logs = self.executor.execute(self.env, chain)?;
        parse_module_outputs(chain, &logs)
    }

    pub fn report(&self, tracker: &ProgressTracker) {
        self.sink.report(tracker.progress());
    }
}

//! Execution of process chains.
//!
//! The orchestration never runs GRASS modules itself; it hands chains to a
//! [`ProcessExecutor`]. [`GrassCli`] is the executor used by the server.

mod grass;

pub use grass::GrassCli;

use crate::error::{ProcessingError, Result};
use crate::process_chain::{ProcessChain, ProcessStep, StepLog};
use log::debug;
use std::path::PathBuf;

/// The GRASS database, project and mapset a chain runs in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrassEnvironment {
    pub gisdbase: PathBuf,
    pub project: String,
    pub mapset: String,
}

impl GrassEnvironment {
    pub fn mapset_path(&self) -> PathBuf {
        self.gisdbase.join(&self.project).join(&self.mapset)
    }
}

pub trait ProcessExecutor: Send + Sync {
    /// Run a single step. A non-zero return code is reported in the log,
    /// only failures to run the module at all are errors.
    fn run_step(&self, env: &GrassEnvironment, step: &ProcessStep) -> Result<StepLog>;

    /// Run all steps in order, halting on the first non-zero return code.
    fn execute(&self, env: &GrassEnvironment, chain: &ProcessChain) -> Result<Vec<StepLog>> {
        let mut logs = Vec::with_capacity(chain.list.len());
        for step in &chain.list {
            debug!("Running {} ({}) in mapset {}", step.module, step.display_id(), env.mapset);
            let log = self.run_step(env, step)?;
            if log.return_code != 0 {
                return Err(ProcessingError::ToolFailed {
                    id: log.id,
                    module: log.module,
                    return_code: log.return_code,
                    stderr: log.stderr.trim().to_string(),
                });
            }
            logs.push(log);
        }
        Ok(logs)
    }
}

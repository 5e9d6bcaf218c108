use super::{GrassEnvironment, ProcessExecutor};
use crate::error::{ProcessingError, Result};
use crate::process_chain::{ProcessStep, StepLog};
use log::{debug, warn};
use std::path::PathBuf;
use std::process::Command;

/// Runs every step as `grass <mapset path> --exec <module> ...`.
#[derive(Clone, Debug)]
pub struct GrassCli {
    executable: PathBuf,
}

impl GrassCli {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Module arguments in GRASS command line syntax.
    pub fn arguments(step: &ProcessStep) -> Vec<String> {
        let mut args = Vec::new();
        if !step.flags.is_empty() {
            args.push(format!("-{}", step.flags));
        }
        if step.overwrite {
            args.push("--overwrite".to_string());
        }
        args.extend(
            step.inputs
                .iter()
                .chain(&step.outputs)
                .map(|p| format!("{}={}", p.param, p.value)),
        );
        args
    }
}

impl ProcessExecutor for GrassCli {
    fn run_step(&self, env: &GrassEnvironment, step: &ProcessStep) -> Result<StepLog> {
        let args = Self::arguments(step);
        debug!("{} --exec {} {}", env.mapset_path().display(), step.module, args.join(" "));

        let output = Command::new(&self.executable)
            .arg(env.mapset_path())
            .arg("--exec")
            .arg(&step.module)
            .args(&args)
            .output()
            .map_err(|e| ProcessingError::io(&self.executable, e))?;

        let return_code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if return_code != 0 {
            warn!("{} exited with {return_code}: {}", step.module, stderr.trim());
        }
        Ok(StepLog {
            id: step.display_id().to_string(),
            module: step.module.clone(),
            return_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr,
        })
    }
}

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

pub const LISTEN_ADDRESS_DEFAULT: &str = "127.0.0.1:8080";
pub const JOB_TIMEOUT_DEFAULT: u64 = 3600;
pub const JSON_LIMIT_DEFAULT: usize = 10 * 1024 * 1024;

/// Tiling and merge server for GRASS GIS projects.
///
/// Every option can also be set through its environment variable.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(about, version)]
pub struct Config {
    /// The socket address to bind.
    #[arg(short, long, env = "TILING_LISTEN_ADDRESS", default_value = LISTEN_ADDRESS_DEFAULT)]
    pub listen_address: String,
    /// GRASS database holding the projects and their mapsets.
    #[arg(short = 'd', long, env = "TILING_GRASS_DATABASE")]
    pub grass_database: PathBuf,
    /// The `grass` executable used to run modules.
    #[arg(long, env = "TILING_GRASS_EXECUTABLE", default_value = "grass")]
    pub grass_executable: PathBuf,
    /// Directory for temporary databases and registration files.
    /// [DEFAULT: the system temporary directory]
    #[arg(long, env = "TILING_TMP_WORKDIR")]
    pub tmp_workdir: Option<PathBuf>,
    /// Directory of the mapset lock files. [DEFAULT: <tmp_workdir>/locks]
    #[arg(long, env = "TILING_LOCK_DIR")]
    pub lock_dir: Option<PathBuf>,
    /// Seconds a job may run before it is marked as timed out.
    #[arg(long, env = "TILING_JOB_TIMEOUT", default_value_t = JOB_TIMEOUT_DEFAULT)]
    pub job_timeout: u64,
    /// Owner of the jobs started through this server.
    #[arg(long, env = "TILING_USER_ID", default_value = "user")]
    pub user_id: String,
    /// Maximum size of a JSON request body in bytes.
    #[arg(long, env = "TILING_JSON_LIMIT", default_value_t = JSON_LIMIT_DEFAULT)]
    pub json_limit: usize,
}

impl Config {
    pub fn tmp_workdir(&self) -> PathBuf {
        self.tmp_workdir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn lock_dir(&self) -> PathBuf {
        self.lock_dir
            .clone()
            .unwrap_or_else(|| self.tmp_workdir().join("locks"))
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout)
    }
}

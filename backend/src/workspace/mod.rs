//! Mapset management: existence, locking, deletion, temporary environments
//! and the copy back of a temporary working mapset into its target.

mod fs;

pub use fs::FsWorkspaces;

use crate::engine::GrassEnvironment;
use crate::error::Result;
use tempfile::TempDir;

/// The reserved mapset holding the project's default region. Never deleted.
pub const PERMANENT: &str = "PERMANENT";

/// A GRASS environment living in a temporary database.
///
/// The database directory is removed when the value is dropped.
#[derive(Debug)]
pub struct TempEnvironment {
    pub env: GrassEnvironment,
    _dir: Option<TempDir>,
}

impl TempEnvironment {
    pub fn new(env: GrassEnvironment, dir: TempDir) -> Self {
        Self {
            env,
            _dir: Some(dir),
        }
    }

    /// An environment without an owned directory, for managers that keep
    /// their working mapsets elsewhere.
    pub fn detached(env: GrassEnvironment) -> Self {
        Self { env, _dir: None }
    }
}

/// How the working mapset of a temporary database starts out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkingMapset<'a> {
    /// An empty mapset `name` with the region of mapset `region_from`.
    Fresh { name: &'a str, region_from: &'a str },
    /// A full copy of the existing mapset of the same name, including its
    /// region, attribute database and temporal database.
    CopyOf(&'a str),
}

impl WorkingMapset<'_> {
    pub fn name(&self) -> &str {
        match self {
            WorkingMapset::Fresh { name, .. } => name,
            WorkingMapset::CopyOf(name) => name,
        }
    }
}

pub trait WorkspaceManager: Send + Sync {
    fn exists(&self, project: &str, mapset: &str) -> bool;

    /// Take the exclusive lock of a mapset. Fails fast with
    /// [`LockContention`](crate::error::ProcessingError::LockContention)
    /// if the lock is held.
    fn lock(&self, project: &str, mapset: &str) -> Result<()>;

    /// Release a lock. Releasing a lock that is not held is not an error.
    fn unlock(&self, project: &str, mapset: &str) -> Result<()>;

    /// Remove a mapset with all its data. Removing an absent mapset is not
    /// an error.
    fn delete(&self, project: &str, mapset: &str) -> Result<()>;

    /// Create a temporary database with `linked` mapsets of the project
    /// available read-only next to the writable working mapset described by
    /// `working`.
    fn create_temp_environment(
        &self,
        project: &str,
        linked: &[String],
        working: WorkingMapset<'_>,
    ) -> Result<TempEnvironment>;

    /// Copy the working mapset of `temp` into `target`, creating the target
    /// if needed and overwriting maps that exist in both.
    fn copy_merge(&self, temp: &TempEnvironment, project: &str, target: &str) -> Result<()>;
}

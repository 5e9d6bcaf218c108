use crate::engine::GrassEnvironment;
use crate::error::{ProcessingError, Result};
use crate::workspace::{TempEnvironment, WorkingMapset, WorkspaceManager, PERMANENT};
use log::{info, warn};
use std::sync::Arc;

/// A locked target mapset and the temporary environment the job writes to.
///
/// [`finalize`](Self::finalize) consumes the value, so results are copied into
/// the target at most once and only by a job that reached the end. Dropping
/// an unfinalized workspace releases the lock and throws the temporary
/// database away.
pub struct PreparedWorkspace {
    workspaces: Arc<dyn WorkspaceManager>,
    project: String,
    target: String,
    target_existed: bool,
    temp: TempEnvironment,
    finalized: bool,
}

impl std::fmt::Debug for PreparedWorkspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedWorkspace")
            .field("project", &self.project)
            .field("target", &self.target)
            .field("target_existed", &self.target_existed)
            .field("temp", &self.temp)
            .field("finalized", &self.finalized)
            .finish_non_exhaustive()
    }
}

/// Lock `target` and build the temporary environment linking `sources`.
///
/// The working mapset of the temporary database always carries the target's
/// name, so maps and series registered there are qualified with the target.
/// A fresh target starts empty with the `PERMANENT` region. An existing
/// target is copied in whole, so its region, attribute tables and series are
/// extended instead of replaced when the working mapset is copied back.
pub fn prepare(
    workspaces: Arc<dyn WorkspaceManager>,
    project: &str,
    target: &str,
    sources: &[String],
) -> Result<PreparedWorkspace> {
    workspaces.lock(project, target)?;
    match build_environment(workspaces.as_ref(), project, target, sources) {
        Ok((temp, target_existed)) => {
            info!(
                "Prepared mapset {project}/{target} (existing: {target_existed}), working in {}",
                temp.env.mapset
            );
            Ok(PreparedWorkspace {
                workspaces,
                project: project.to_string(),
                target: target.to_string(),
                target_existed,
                temp,
                finalized: false,
            })
        }
        Err(e) => {
            if let Err(unlock_error) = workspaces.unlock(project, target) {
                warn!("Unable to unlock mapset {project}/{target}: {unlock_error}");
            }
            Err(e)
        }
    }
}

fn build_environment(
    workspaces: &dyn WorkspaceManager,
    project: &str,
    target: &str,
    sources: &[String],
) -> Result<(TempEnvironment, bool)> {
    for source in sources {
        if !workspaces.exists(project, source) {
            return Err(ProcessingError::MissingWorkspace {
                project: project.to_string(),
                mapset: source.clone(),
            });
        }
    }

    let mut linked = vec![PERMANENT.to_string()];
    linked.extend(sources.iter().filter(|s| *s != PERMANENT).cloned());

    let target_existed = workspaces.exists(project, target);
    let working = if target_existed {
        WorkingMapset::CopyOf(target)
    } else {
        WorkingMapset::Fresh {
            name: target,
            region_from: PERMANENT,
        }
    };
    let temp = workspaces.create_temp_environment(project, &linked, working)?;
    Ok((temp, target_existed))
}

impl PreparedWorkspace {
    pub fn environment(&self) -> &GrassEnvironment {
        &self.temp.env
    }

    pub fn target_existed(&self) -> bool {
        self.target_existed
    }

    /// Copy the working mapset into the target and release the lock.
    pub fn finalize(mut self) -> Result<()> {
        self.workspaces
            .copy_merge(&self.temp, &self.project, &self.target)?;
        self.finalized = true;
        Ok(())
    }
}

impl Drop for PreparedWorkspace {
    fn drop(&mut self) {
        if !self.finalized {
            warn!(
                "Discarding unfinished work for mapset {}/{}",
                self.project, self.target
            );
        }
        if let Err(e) = self.workspaces.unlock(&self.project, &self.target) {
            warn!("Unable to unlock mapset {}/{}: {e}", self.project, self.target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::test_utils::MemoryWorkspaces;

    fn sources() -> Vec<String> {
        vec!["tile1".to_string(), "tile2".to_string()]
    }

    #[test]
    fn fresh_target_works_under_its_own_name() {
        let workspaces = Arc::new(MemoryWorkspaces::with_mapsets(&["PERMANENT", "tile1", "tile2"]));
        let prepared = prepare(workspaces.clone(), "nc", "merged", &sources()).unwrap();
        assert!(!prepared.target_existed());
        assert_eq!(prepared.environment().mapset, "merged");
        assert!(workspaces.locks.lock().unwrap().contains("merged"));

        prepared.finalize().unwrap();
        assert_eq!(
            workspaces.calls(),
            [
                "lock merged",
                "temp merged linking PERMANENT,tile1,tile2 region PERMANENT",
                "copy merged to merged",
                "unlock merged",
            ]
        );
        assert!(workspaces.locks.lock().unwrap().is_empty());
    }

    #[test]
    fn existing_target_is_worked_on_as_a_copy() {
        let workspaces = Arc::new(MemoryWorkspaces::with_mapsets(&[
            "PERMANENT", "tile1", "tile2", "merged",
        ]));
        let prepared = prepare(workspaces.clone(), "nc", "merged", &sources()).unwrap();
        assert!(prepared.target_existed());
        assert_eq!(prepared.environment().mapset, "merged");

        prepared.finalize().unwrap();
        assert_eq!(
            workspaces.calls(),
            [
                "lock merged",
                "temp merged linking PERMANENT,tile1,tile2 copied from merged",
                "copy merged to merged",
                "unlock merged",
            ]
        );
    }

    #[test]
    fn missing_source_fails_and_releases_lock() {
        let workspaces = Arc::new(MemoryWorkspaces::with_mapsets(&["PERMANENT", "tile1"]));
        let error = prepare(workspaces.clone(), "nc", "merged", &sources()).unwrap_err();
        assert!(matches!(error, ProcessingError::MissingWorkspace { ref mapset, .. } if mapset == "tile2"));
        assert!(workspaces.locks.lock().unwrap().is_empty());
    }

    #[test]
    fn locked_target_is_reported_as_contention() {
        let workspaces = Arc::new(MemoryWorkspaces::with_mapsets(&["PERMANENT", "tile1", "tile2"]));
        let _first = prepare(workspaces.clone(), "nc", "merged", &sources()).unwrap();
        let error = prepare(workspaces.clone(), "nc", "merged", &sources()).unwrap_err();
        assert_eq!(error.kind(), "LockContention");
        // the failed attempt must not release the lock of the first job
        assert!(workspaces.locks.lock().unwrap().contains("merged"));
    }

    #[test]
    fn dropping_without_finalize_never_copies() {
        let workspaces = Arc::new(MemoryWorkspaces::with_mapsets(&["PERMANENT", "tile1", "tile2"]));
        let prepared = prepare(workspaces.clone(), "nc", "merged", &sources()).unwrap();
        drop(prepared);
        assert!(!workspaces.calls().iter().any(|c| c.starts_with("copy")));
        assert!(!workspaces.exists("nc", "merged"));
        assert!(workspaces.locks.lock().unwrap().is_empty());
    }
}

use super::{TempEnvironment, WorkingMapset, WorkspaceManager};
use crate::engine::GrassEnvironment;
use crate::error::{ProcessingError, Result};
use log::{debug, info};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Region file of a mapset; `PERMANENT` also carries `DEFAULT_WIND`.
const WIND: &str = "WIND";
const DEFAULT_WIND: &str = "DEFAULT_WIND";

/// Mapsets as directories of a GRASS database on the local filesystem.
///
/// Locks are files `<lock_dir>/<project>/<mapset>.lock` created atomically,
/// so a second locker fails immediately instead of waiting.
#[derive(Clone, Debug)]
pub struct FsWorkspaces {
    grass_database: PathBuf,
    lock_dir: PathBuf,
    tmp_workdir: PathBuf,
}

impl FsWorkspaces {
    pub fn new(grass_database: PathBuf, lock_dir: PathBuf, tmp_workdir: PathBuf) -> Self {
        Self {
            grass_database,
            lock_dir,
            tmp_workdir,
        }
    }

    fn mapset_path(&self, project: &str, mapset: &str) -> PathBuf {
        self.grass_database.join(project).join(mapset)
    }

    fn lock_path(&self, project: &str, mapset: &str) -> PathBuf {
        self.lock_dir.join(project).join(format!("{mapset}.lock"))
    }

    fn region_file(&self, project: &str, mapset: &str) -> PathBuf {
        let mapset_dir = self.mapset_path(project, mapset);
        let wind = mapset_dir.join(WIND);
        if wind.is_file() {
            wind
        } else {
            mapset_dir.join(DEFAULT_WIND)
        }
    }
}

fn create_dir_all(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| ProcessingError::io(path, e))
}

#[cfg(unix)]
fn link_dir(original: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}

#[cfg(windows)]
fn link_dir(original: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_dir(original, link)
}

/// Recursively copy `from` into `to`, replacing files present in both.
fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    create_dir_all(to)?;
    for entry in fs::read_dir(from).map_err(|e| ProcessingError::io(from, e))? {
        let entry = entry.map_err(|e| ProcessingError::io(from, e))?;
        let source = entry.path();
        let destination = to.join(entry.file_name());
        if source.is_dir() {
            copy_tree(&source, &destination)?;
        } else {
            fs::copy(&source, &destination).map_err(|e| ProcessingError::io(&source, e))?;
        }
    }
    Ok(())
}

impl WorkspaceManager for FsWorkspaces {
    fn exists(&self, project: &str, mapset: &str) -> bool {
        self.mapset_path(project, mapset).is_dir()
    }

    fn lock(&self, project: &str, mapset: &str) -> Result<()> {
        let path = self.lock_path(project, mapset);
        if let Some(parent) = path.parent() {
            create_dir_all(parent)?;
        }
        match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => {
                debug!("Locked mapset {project}/{mapset}");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(ProcessingError::LockContention {
                project: project.to_string(),
                mapset: mapset.to_string(),
            }),
            Err(e) => Err(ProcessingError::io(path, e)),
        }
    }

    fn unlock(&self, project: &str, mapset: &str) -> Result<()> {
        let path = self.lock_path(project, mapset);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Unlocked mapset {project}/{mapset}");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ProcessingError::io(path, e)),
        }
    }

    fn delete(&self, project: &str, mapset: &str) -> Result<()> {
        let path = self.mapset_path(project, mapset);
        match fs::remove_dir_all(&path) {
            Ok(()) => {
                info!("Deleted mapset {project}/{mapset}");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ProcessingError::io(path, e)),
        }
    }

    fn create_temp_environment(
        &self,
        project: &str,
        linked: &[String],
        working: WorkingMapset<'_>,
    ) -> Result<TempEnvironment> {
        create_dir_all(&self.tmp_workdir)?;
        let dir = tempfile::Builder::new()
            .prefix("grassdb_")
            .tempdir_in(&self.tmp_workdir)
            .map_err(|e| ProcessingError::io(&self.tmp_workdir, e))?;

        let project_dir = dir.path().join(project);
        create_dir_all(&project_dir)?;
        for mapset in linked {
            let original = self.mapset_path(project, mapset);
            let link = project_dir.join(mapset);
            link_dir(&original, &link).map_err(|e| ProcessingError::io(&link, e))?;
        }

        let working_mapset = working.name();
        let working_dir = project_dir.join(working_mapset);
        match working {
            WorkingMapset::Fresh { region_from, .. } => {
                create_dir_all(&working_dir)?;
                let region = self.region_file(project, region_from);
                fs::copy(&region, working_dir.join(WIND))
                    .map_err(|e| ProcessingError::io(&region, e))?;
            }
            WorkingMapset::CopyOf(existing) => {
                copy_tree(&self.mapset_path(project, existing), &working_dir)?;
            }
        }

        debug!(
            "Created temporary database {} with working mapset {working_mapset}",
            dir.path().display()
        );
        Ok(TempEnvironment::new(
            GrassEnvironment {
                gisdbase: dir.path().to_path_buf(),
                project: project.to_string(),
                mapset: working_mapset.to_string(),
            },
            dir,
        ))
    }

    fn copy_merge(&self, temp: &TempEnvironment, project: &str, target: &str) -> Result<()> {
        let target_dir = self.mapset_path(project, target);
        let target_existed = target_dir.is_dir();
        let working_dir = temp.env.mapset_path();
        for entry in fs::read_dir(&working_dir).map_err(|e| ProcessingError::io(&working_dir, e))? {
            let entry = entry.map_err(|e| ProcessingError::io(&working_dir, e))?;
            // the region of an existing target stays untouched
            if target_existed && entry.file_name() == WIND {
                continue;
            }
            let source = entry.path();
            let destination = target_dir.join(entry.file_name());
            if source.is_dir() {
                copy_tree(&source, &destination)?;
            } else {
                create_dir_all(&target_dir)?;
                fs::copy(&source, &destination).map_err(|e| ProcessingError::io(&source, e))?;
            }
        }
        info!("Copied working mapset {} into {project}/{target}", temp.env.mapset);
        Ok(())
    }
}

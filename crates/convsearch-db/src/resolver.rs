use std::path::{Path, PathBuf};
use std::time::SystemTime;

use convsearch_common::{Error, Result};
use tracing::debug;

const DB_EXTENSION: &str = "db";

/// Picks the archive database to open for one search.
///
/// Resolution is repeated on every call so the export file can be swapped
/// between searches without restarting the server.
#[derive(Debug, Clone)]
pub struct PathResolver {
    override_path: Option<PathBuf>,
    fallback_dir: PathBuf,
}

impl PathResolver {
    pub fn new(override_path: Option<PathBuf>, fallback_dir: impl Into<PathBuf>) -> Self {
        Self {
            override_path,
            fallback_dir: fallback_dir.into(),
        }
    }

    pub fn fallback_dir(&self) -> &Path {
        &self.fallback_dir
    }

    pub fn resolve(&self) -> Result<PathBuf> {
        if let Some(path) = &self.override_path {
            if path.is_file() {
                debug!("using database override {}", path.display());
                return Ok(path.clone());
            }
            debug!(
                "database override {} is not a file, scanning {}",
                path.display(),
                self.fallback_dir.display()
            );
        }

        let dir = &self.fallback_dir;
        if !dir.is_dir() {
            return Err(Error::NotFound(format!(
                "db/ directory not found: {}",
                dir.display()
            )));
        }

        let newest = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                if !is_db_file_name(&path) {
                    return None;
                }
                let metadata = entry.metadata().ok()?;
                if !metadata.is_file() {
                    return None;
                }
                let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                Some((modified, path))
            })
            .max();

        match newest {
            Some((_, path)) => {
                debug!("resolved database {}", path.display());
                Ok(path)
            }
            None => Err(Error::NotFound(format!(
                "No *.{DB_EXTENSION} file in {}",
                dir.display()
            ))),
        }
    }
}

/// Visible `*.db` names only, matching a shell glob.
fn is_db_file_name(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_none_or(|name| name.starts_with('.'));
    !hidden && path.extension().and_then(|ext| ext.to_str()) == Some(DB_EXTENSION)
}

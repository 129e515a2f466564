//! Snapshot persistence, one file per library.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use triage_shared::{decode_libraries, encode_libraries, LibrarySnapshot, SnapshotFormat};

/// Load/save previous runs' snapshots
pub trait SnapshotStore: Send + Sync {
    /// Previous snapshot of `library`, or None if absent or unusable
    fn load(&self, library: &str) -> Option<LibrarySnapshot>;

    fn save(&self, snapshot: &LibrarySnapshot) -> Result<()>;
}

/// Files under `dir`, named `<library>.json` or `<library>.bin`
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    dir: PathBuf,
    format: SnapshotFormat,
}

impl FileSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>, format: SnapshotFormat) -> Self {
        Self {
            dir: dir.into(),
            format,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, library: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", library, self.format.extension()))
    }

    /// Corrupt files are removed so later runs don't trip over them again
    fn discard(&self, path: &Path, reason: &str) {
        warn!("Discarding unusable snapshot {}: {}", path.display(), reason);
        if let Err(e) = fs::remove_file(path) {
            warn!("Could not remove {}: {}", path.display(), e);
        }
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self, library: &str) -> Option<LibrarySnapshot> {
        let path = self.path_for(library);
        if !path.exists() {
            debug!("No previous snapshot for {}", library);
            return None;
        }

        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) => {
                self.discard(&path, &e.to_string());
                return None;
            }
        };

        match decode_libraries(&bytes, self.format) {
            Ok(libraries) => {
                let found = libraries.into_iter().find(|l| l.name == library);
                if found.is_none() {
                    warn!("{} holds no entry for {}", path.display(), library);
                }
                found
            }
            Err(e) => {
                self.discard(&path, &e.to_string());
                None
            }
        }
    }

    fn save(&self, snapshot: &LibrarySnapshot) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let bytes = encode_libraries(std::slice::from_ref(snapshot), self.format)
            .with_context(|| format!("Failed to encode snapshot of {}", snapshot.name))?;

        let path = self.path_for(&snapshot.name);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to move snapshot into {}", path.display()))?;

        debug!("Saved {} failure(s) for {}", snapshot.len(), snapshot.name);
        Ok(())
    }
}

/*!
Persistent snapshot of the objects seen on the previous run
*/

use std::path::{Path, PathBuf};

use sentry_data::{Snapshot, SnapshotFile, TrackedObject};
use tracing::{debug, info, warn};

use crate::monitor::error::AsentryError;

/// Reads and replaces the snapshot file.
pub struct StateManager {
    path: PathBuf,
}

impl StateManager {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the previous snapshot.
    ///
    /// A missing, unreadable or malformed file yields an empty snapshot: the
    /// run then treats every fetched object as new.
    pub fn load(&self) -> Snapshot {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No snapshot at {:?}, starting fresh", self.path);
                return Snapshot::new();
            }
            Err(e) => {
                warn!("Cannot read snapshot {:?}: {}", self.path, e);
                return Snapshot::new();
            }
        };

        match SnapshotFile::from_json(&content) {
            Ok(file) => {
                let snapshot = Snapshot::from(file);
                debug!("Loaded {} objects from {:?}", snapshot.len(), self.path);
                snapshot
            }
            Err(e) => {
                warn!("Ignoring malformed snapshot {:?}: {}", self.path, e);
                Snapshot::new()
            }
        }
    }

    /// Replace the snapshot with the given objects.
    pub fn save(&self, objects: &[TrackedObject]) -> Result<(), AsentryError> {
        let json = SnapshotFile::from_objects(objects).to_json()?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| self.persistence(source))?;
            }
        }
        std::fs::write(&self.path, json).map_err(|source| self.persistence(source))?;

        debug!("Saved {} objects to {:?}", objects.len(), self.path);
        Ok(())
    }

    fn persistence(&self, source: std::io::Error) -> AsentryError {
        AsentryError::Persistence {
            path: self.path.clone(),
            source,
        }
    }
}

//! Snapshot persistence.
//!
//! Snapshots serialize to pretty-printed JSON. Writes go through a
//! temporary sibling file and a rename so a crash mid-write never leaves
//! a truncated cache behind.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ExplorerError, Result};
use crate::graph::Snapshot;

/// On-disk cache for a single snapshot.
pub struct SnapshotCache {
    path: PathBuf,
}

impl SnapshotCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cached snapshot. A missing file is a cold start, not an
    /// error, and yields an empty snapshot.
    pub fn load(&self) -> Result<Snapshot> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no snapshot cache, starting cold");
                return Ok(Snapshot::default());
            }
            Err(e) => return Err(e.into()),
        };
        let snapshot: Snapshot =
            serde_json::from_str(&raw).map_err(|e| ExplorerError::InvalidSnapshot {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
        debug!(
            path = %self.path.display(),
            files = snapshot.files.len(),
            declarations = snapshot.declarations.len(),
            "loaded snapshot cache"
        );
        Ok(snapshot)
    }

    /// Persist a snapshot, creating parent directories as needed.
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        info!(
            path = %self.path.display(),
            declarations = snapshot.declarations.len(),
            "saved snapshot cache"
        );
        Ok(())
    }
}

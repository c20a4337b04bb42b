//! services/api/src/adapters/store.rs
//!
//! The snapshot store adapter, the concrete implementation of the `SnapshotStore`
//! port from the `core` crate. The whole session lives in one JSON file that is
//! replaced atomically on every save.

use flashcard_core::domain::Session;
use flashcard_core::ports::{PortError, PortResult, SnapshotStore};
use flashcard_core::store::{decode_snapshot, encode_snapshot};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A file-backed store that implements the `SnapshotStore` port.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Creates a new `JsonFileStore`. Nothing is touched until the first load or save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The sibling file a save is staged in before being renamed into place.
    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "snapshot".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

//=========================================================================================
// `SnapshotStore` Trait Implementation
//=========================================================================================

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> PortResult<Option<Session>> {
        let blob = match fs::read_to_string(&self.path) {
            Ok(blob) => blob,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PortError::Unexpected(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };
        decode_snapshot(&blob).map(Some)
    }

    /// Writes to a staging file and renames it over the target, so a reader sees
    /// either the old blob or the new one, never a partial write.
    fn save(&self, session: &Session) -> PortResult<()> {
        let blob = encode_snapshot(session)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| PortError::Unexpected(format!("Failed to create {}: {}", parent.display(), e)))?;
        }
        let staging = self.staging_path();
        fs::write(&staging, blob)
            .map_err(|e| PortError::Unexpected(format!("Failed to write {}: {}", staging.display(), e)))?;
        fs::rename(&staging, &self.path)
            .map_err(|e| PortError::Unexpected(format!("Failed to replace {}: {}", self.path.display(), e)))?;
        debug!(path = %self.path.display(), "Session snapshot saved");
        Ok(())
    }
}

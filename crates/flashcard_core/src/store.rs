//! crates/flashcard_core/src/store.rs
//!
//! The versioned blob format shared by every `SnapshotStore`, and an in-memory
//! store used for tests and ephemeral runs.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use crate::domain::Session;
use crate::ports::{PortError, PortResult, SnapshotStore};

/// Bumped whenever the stored layout changes incompatibly.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct SnapshotEnvelope<T> {
    version: u32,
    session: T,
}

/// Serializes a session into the versioned blob.
pub fn encode_snapshot(session: &Session) -> PortResult<String> {
    serde_json::to_string(&SnapshotEnvelope {
        version: SNAPSHOT_VERSION,
        session,
    })
    .map_err(|e| PortError::Unexpected(format!("Failed to encode snapshot: {}", e)))
}

/// Parses a versioned blob. A foreign version is reported like any corrupt blob.
pub fn decode_snapshot(blob: &str) -> PortResult<Session> {
    let envelope: SnapshotEnvelope<Session> = serde_json::from_str(blob)
        .map_err(|e| PortError::Unexpected(format!("Corrupt snapshot: {}", e)))?;
    if envelope.version != SNAPSHOT_VERSION {
        return Err(PortError::Unexpected(format!(
            "Unsupported snapshot version {} (expected {})",
            envelope.version, SNAPSHOT_VERSION
        )));
    }
    Ok(envelope.session)
}

/// Keeps the encoded blob in memory, so it exercises the same format as the file store.
#[derive(Default)]
pub struct InMemoryStore {
    blob: Mutex<Option<String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with a raw blob, corrupt or not.
    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            blob: Mutex::new(Some(blob.into())),
        }
    }

    pub fn blob(&self) -> Option<String> {
        self.blob.lock().ok().and_then(|guard| guard.clone())
    }
}

impl SnapshotStore for InMemoryStore {
    fn load(&self) -> PortResult<Option<Session>> {
        let guard = self
            .blob
            .lock()
            .map_err(|_| PortError::Unexpected("snapshot lock poisoned".to_string()))?;
        guard.as_deref().map(decode_snapshot).transpose()
    }

    fn save(&self, session: &Session) -> PortResult<()> {
        let encoded = encode_snapshot(session)?;
        let mut guard = self
            .blob
            .lock()
            .map_err(|_| PortError::Unexpected("snapshot lock poisoned".to_string()))?;
        *guard = Some(encoded);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Theme, View};

    #[test]
    fn empty_store_loads_nothing() {
        let store = InMemoryStore::new();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn saved_session_loads_back() {
        let store = InMemoryStore::new();
        let session = Session {
            view: View::Upload,
            theme: Theme::Light,
            current_user: Some("a@x.com".to_string()),
            ..Session::default()
        };
        store.save(&session).unwrap();
        assert_eq!(store.load().unwrap(), Some(session));
        assert!(store.blob().unwrap().contains("\"version\":1"));
    }

    #[test]
    fn corrupt_blob_is_an_error_not_a_panic() {
        let store = InMemoryStore::with_blob("{not json");
        assert!(matches!(store.load(), Err(PortError::Unexpected(_))));
    }

    #[test]
    fn foreign_version_is_rejected() {
        let store = InMemoryStore::with_blob(r#"{"version":99,"session":{"view":"auth"}}"#);
        let err = store.load().unwrap_err();
        assert!(err.to_string().contains("Unsupported snapshot version 99"));
    }
}

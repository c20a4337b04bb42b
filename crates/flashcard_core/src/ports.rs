//! crates/flashcard_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, keeping the core
//! independent of the blob store, the file decoders and the AI backend.

use async_trait::async_trait;
use crate::domain::{FileData, Flashcard, Session, UploadedFile};
use crate::error::{ExtractionError, GenerationError};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for infrastructure port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Single-key blob storage for the whole `Session`.
///
/// Both calls are synchronous; `save` must be atomic from the caller's point of view.
pub trait SnapshotStore: Send + Sync {
    /// Returns `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> PortResult<Option<Session>>;

    fn save(&self, session: &Session) -> PortResult<()>;
}

#[async_trait]
pub trait TextExtractionService: Send + Sync {
    /// Turns an uploaded file into text (or a base64 image payload) plus its mime type.
    async fn extract(&self, file: &UploadedFile) -> Result<FileData, ExtractionError>;
}

#[async_trait]
pub trait FlashcardGenerationService: Send + Sync {
    /// Synthesizes at most `max_cards` question/answer pairs from the content.
    async fn generate_flashcards(
        &self,
        file: &FileData,
        max_cards: usize,
    ) -> Result<Vec<Flashcard>, GenerationError>;
}

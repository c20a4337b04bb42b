//! services/api/src/error.rs
//!
//! Defines the primary error type for the API service and the mapping of core
//! errors onto HTTP responses at the UI boundary.

use crate::config::ConfigError;
use axum::http::StatusCode;
use flashcard_core::error::{AuthError, FlashcardError, GenerationError};

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The error half of every REST handler.
pub type HandlerError = (StatusCode, String);

/// Maps a core error to a status and the message shown to the user.
pub fn user_facing(err: FlashcardError) -> HandlerError {
    let status = match &err {
        FlashcardError::Extraction(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        FlashcardError::Generation(GenerationError::NoCards) => StatusCode::UNPROCESSABLE_ENTITY,
        FlashcardError::Generation(_) => StatusCode::BAD_GATEWAY,
        FlashcardError::Validation(_) => StatusCode::BAD_REQUEST,
        FlashcardError::Auth(AuthError::DuplicateEmail) => StatusCode::CONFLICT,
        FlashcardError::Auth(AuthError::UnknownEmail) => StatusCode::NOT_FOUND,
        FlashcardError::Auth(_) | FlashcardError::NotSignedIn => StatusCode::UNAUTHORIZED,
        FlashcardError::InvalidTransition { .. } | FlashcardError::NoActiveCards => StatusCode::BAD_REQUEST,
        FlashcardError::SetNotFound(_) | FlashcardError::CardOutOfRange(_) => StatusCode::NOT_FOUND,
        FlashcardError::StaleGeneration
        | FlashcardError::SupersededGeneration
        | FlashcardError::StaleCardList => StatusCode::CONFLICT,
    };
    (status, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_cards_is_distinct_from_a_failed_generation() {
        let (status, message) = user_facing(GenerationError::NoCards.into());
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(message.contains("couldn't generate any flashcards"));

        let (status, _) = user_facing(GenerationError::Unavailable("timeout".to_string()).into());
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn discarded_results_are_conflicts() {
        assert_eq!(user_facing(FlashcardError::SupersededGeneration).0, StatusCode::CONFLICT);
        assert_eq!(user_facing(FlashcardError::StaleCardList).0, StatusCode::CONFLICT);
    }

    #[test]
    fn auth_failures_map_to_client_errors() {
        assert_eq!(user_facing(AuthError::DuplicateEmail.into()).0, StatusCode::CONFLICT);
        assert_eq!(user_facing(AuthError::InvalidCredentials.into()).0, StatusCode::UNAUTHORIZED);
    }
}

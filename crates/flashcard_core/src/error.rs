//! crates/flashcard_core/src/error.rs
//!
//! The domain error taxonomy. Every variant is recoverable at the UI boundary
//! and carries a message fit to show the user.

use crate::domain::View;

/// The uploaded file could not be turned into content.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("The uploaded file is empty.")]
    Empty,
    #[error("Unsupported file type: {0}")]
    Unsupported(String),
    #[error("The file could not be read: {0}")]
    Unreadable(String),
}

/// The AI service failed or produced nothing usable.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Failed to generate flashcards. The AI model might be busy or the content could not be processed. ({0})")]
    Unavailable(String),
    #[error("Invalid flashcard format received from AI: {0}")]
    Malformed(String),
    #[error("The AI couldn't generate any flashcards from the provided content. Please try different content or a different file.")]
    NoCards,
}

/// An import payload or user input had the wrong shape.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid flashcard set data: {0}")]
    MalformedJson(String),
    #[error("Invalid flashcard set data: expected a JSON object")]
    NotAnObject,
    #[error("Invalid flashcard set data: missing or empty `{0}`")]
    MissingField(&'static str),
    #[error("Invalid flashcard set data: `flashcards` must be a list")]
    NotASequence,
    #[error("Invalid flashcard set data: card {0} needs a `question` and an `answer`")]
    InvalidCard(usize),
    #[error("A set name is required.")]
    EmptyName,
    #[error("No account found for {0}; the set was not imported.")]
    UnknownOwner(String),
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("An account with this email already exists.")]
    DuplicateEmail,
    #[error("Passwords do not match.")]
    PasswordMismatch,
    #[error("Invalid email or password.")]
    InvalidCredentials,
    #[error("No account found with that email address.")]
    UnknownEmail,
}

/// The umbrella error returned by `FlashcardApp` operations.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum FlashcardError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("Cannot {action} from the {view} view.")]
    InvalidTransition { view: View, action: &'static str },
    #[error("You need to sign in first.")]
    NotSignedIn,
    #[error("There are no flashcards to work with.")]
    NoActiveCards,
    #[error("Flashcard set not found: {0}")]
    SetNotFound(String),
    #[error("There is no card at position {0}.")]
    CardOutOfRange(usize),
    #[error("The upload finished after you left the upload screen; its result was discarded.")]
    StaleGeneration,
    #[error("A newer upload was started; this result was discarded.")]
    SupersededGeneration,
    #[error("The card list changed while you were studying; the edit was not applied.")]
    StaleCardList,
}

pub type FlashcardResult<T> = Result<T, FlashcardError>;

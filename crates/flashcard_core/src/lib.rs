pub mod auth;
pub mod domain;
pub mod error;
pub mod ports;
pub mod repository;
pub mod session;
pub mod store;
pub mod study;
pub mod upload;

pub use domain::{CredentialSecret, FileData, Flashcard, FlashcardSet, Session, Theme, UploadedFile, User, View};
pub use error::{AuthError, ExtractionError, FlashcardError, FlashcardResult, GenerationError, ValidationError};
pub use ports::{FlashcardGenerationService, PortError, PortResult, SnapshotStore, TextExtractionService};
pub use session::{CardListTicket, FlashcardApp, GenerationTicket, SessionPatch};
pub use store::InMemoryStore;
pub use upload::generate_from_file;

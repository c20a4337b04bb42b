//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-connection study state.

use crate::config::Config;
use flashcard_core::ports::{FlashcardGenerationService, TextExtractionService};
use flashcard_core::study::{MatchBoard, ReviewDeck, TestSession};
use flashcard_core::{CardListTicket, FlashcardApp};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
///
/// `app` is the one session snapshot; the mutex serializes user actions so no two
/// mutations interleave. Never hold it across an extraction or generation await.
#[derive(Clone)]
pub struct AppState {
    pub app: Arc<Mutex<FlashcardApp>>,
    pub config: Arc<Config>,
    pub extractor: Arc<dyn TextExtractionService>,
    pub generator: Arc<dyn FlashcardGenerationService>,
}

//=========================================================================================
// StudySession (Specific to One WebSocket Connection)
//=========================================================================================

/// The engine currently driving a study connection.
pub enum StudyEngine {
    Review(ReviewDeck),
    Test(TestSession),
    Match(MatchBoard),
}

/// The state for a single, active study connection.
pub struct StudySession {
    pub engine: Option<StudyEngine>,
    /// The session card list the engine was loaded from.
    pub card_list: Option<CardListTicket>,
    /// Cancels this connection's pending mismatch clears. Replaced on every
    /// start or restart so timers never outlive the board they were set for.
    pub cancellation_token: CancellationToken,
}

impl StudySession {
    pub fn new() -> Self {
        Self {
            engine: None,
            card_list: None,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Cancels outstanding timers and issues a fresh token.
    pub fn reset_timers(&mut self) {
        self.cancellation_token.cancel();
        self.cancellation_token = CancellationToken::new();
    }
}

impl Default for StudySession {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for StudySession {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}

/// Shared state over an in-memory store with the given services, for handler tests.
#[cfg(test)]
pub(crate) fn test_app_state(
    extractor: Arc<dyn TextExtractionService>,
    generator: Arc<dyn FlashcardGenerationService>,
) -> Arc<AppState> {
    let store = Arc::new(flashcard_core::InMemoryStore::new());
    Arc::new(AppState {
        app: Arc::new(Mutex::new(FlashcardApp::load(store))),
        config: Arc::new(crate::config::test_config()),
        extractor,
        generator,
    })
}

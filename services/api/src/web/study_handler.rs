//! services/api/src/web/study_handler.rs
//!
//! This is the main entry point and control loop for a study WebSocket
//! connection. Each connection owns one engine; card edits are written back to
//! the shared session.

use crate::web::{
    mismatch_task::{send_message, spawn_clear, WsSender},
    protocol::{ClientMessage, ServerMessage},
    state::{AppState, StudySession},
    study::{apply, reload, start, stop},
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use flashcard_core::domain::{Flashcard, View};
use flashcard_core::error::FlashcardError;
use flashcard_core::CardListTicket;
use futures::stream::StreamExt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// The handler for upgrading HTTP requests to study WebSocket connections.
pub async fn study_handler(ws: WebSocketUpgrade, State(app_state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("New study connection established.");

    // The sender is shared with the mismatch timers, which push their own snapshots.
    let (sender, mut receiver) = socket.split();
    let ws_sender: WsSender = Arc::new(Mutex::new(sender));
    let study_lock = Arc::new(Mutex::new(StudySession::new()));

    loop {
        match receiver.next().await {
            Some(Ok(Message::Text(text))) => {
                handle_text_message(text.as_str(), &app_state, &study_lock, &ws_sender).await;
            }
            Some(Ok(Message::Close(_))) => {
                info!("Client sent close message.");
                break;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!("Study connection errored: {}", e);
                break;
            }
            None => {
                info!("Client disconnected.");
                break;
            }
        }
    }

    // --- Cleanup ---
    study_lock.lock().await.cancellation_token.cancel();
    info!("Study connection closed.");
}

/// What one client message produced for the socket.
#[derive(Debug, Default)]
pub(crate) struct Outcome {
    pub replies: Vec<ServerMessage>,
    /// A mismatch clear to schedule, with the token of the board it belongs to.
    pub schedule_clear: Option<(u64, CancellationToken)>,
}

impl Outcome {
    fn error(message: impl Into<String>) -> Self {
        Self {
            replies: vec![ServerMessage::Error { message: message.into() }],
            ..Self::default()
        }
    }
}

/// The active card list and its ticket, if the session is on the flashcards view.
async fn active_cards(app_state: &AppState) -> Result<(CardListTicket, Vec<Flashcard>), String> {
    let app = app_state.app.lock().await;
    if app.view() != View::Flashcards {
        return Err(format!("Study modes are only available on the flashcards view, not {}.", app.view()));
    }
    Ok((app.card_list_ticket(), app.session().active_flashcards.clone()))
}

/// Brings the engine back in line with the session after its card list was replaced.
/// The reload keeps the current mode; leaving the flashcards view stops the engine.
async fn resync(app_state: &AppState, study_lock: &Mutex<StudySession>) -> Vec<ServerMessage> {
    let notice = ServerMessage::Error {
        message: FlashcardError::StaleCardList.to_string(),
    };
    match active_cards(app_state).await {
        Ok((ticket, cards)) => {
            let mut study = study_lock.lock().await;
            let step = reload(&mut study, cards, &mut rand::thread_rng());
            study.card_list = Some(ticket);
            std::iter::once(notice).chain(step.reply).collect()
        }
        Err(message) => {
            stop(&mut *study_lock.lock().await);
            vec![notice, ServerMessage::Error { message }]
        }
    }
}

/// Applies one client message to the connection and the shared session.
///
/// The study lock and the app lock are never held together.
pub(crate) async fn process_message(
    app_state: &AppState,
    study_lock: &Mutex<StudySession>,
    message: ClientMessage,
) -> Outcome {
    if let ClientMessage::Start { mode } = message {
        let (ticket, cards) = match active_cards(app_state).await {
            Ok(loaded) => loaded,
            Err(message) => return Outcome::error(message),
        };
        let mut study = study_lock.lock().await;
        let step = start(&mut study, mode, cards, &mut rand::thread_rng());
        study.card_list = Some(ticket);
        return Outcome {
            replies: step.reply.into_iter().collect(),
            ..Outcome::default()
        };
    }

    let loaded_from = study_lock.lock().await.card_list;
    if let Some(ticket) = loaded_from {
        if ticket != app_state.app.lock().await.card_list_ticket() {
            warn!("Card list was replaced under a running study engine; reloading.");
            return Outcome {
                replies: resync(app_state, study_lock).await,
                ..Outcome::default()
            };
        }
    }

    let (step, token, ticket) = {
        let mut study = study_lock.lock().await;
        let step = apply(&mut study, message, &mut rand::thread_rng());
        (step, study.cancellation_token.clone(), study.card_list)
    };

    if let (Some((index, card)), Some(ticket)) = (step.write_back, ticket) {
        let written = app_state.app.lock().await.write_back_card(ticket, index, card);
        match written {
            Ok(()) => {}
            Err(FlashcardError::StaleCardList) => {
                return Outcome {
                    replies: resync(app_state, study_lock).await,
                    ..Outcome::default()
                };
            }
            Err(e) => {
                warn!(index, "Card edit could not be written back: {}", e);
                let mut outcome = Outcome::error(e.to_string());
                outcome.replies.extend(step.reply);
                return outcome;
            }
        }
    }

    Outcome {
        replies: step.reply.into_iter().collect(),
        schedule_clear: step.schedule_clear.map(|mismatch| (mismatch, token)),
    }
}

/// Helper function to handle the logic for different `ClientMessage` variants.
async fn handle_text_message(
    text: &str,
    app_state: &Arc<AppState>,
    study_lock: &Arc<Mutex<StudySession>>,
    ws_sender: &WsSender,
) {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            warn!("Failed to deserialize client message: {}", e);
            let reply = ServerMessage::Error {
                message: format!("Unrecognized message: {}", e),
            };
            send_message(ws_sender, &reply).await;
            return;
        }
    };

    let outcome = process_message(app_state, study_lock, message).await;

    if let Some((mismatch_token, token)) = outcome.schedule_clear {
        spawn_clear(
            study_lock.clone(),
            ws_sender.clone(),
            app_state.config.mismatch_clear_delay,
            mismatch_token,
            token,
        );
    }

    for reply in &outcome.replies {
        if !send_message(ws_sender, reply).await {
            error!("Failed to send study reply.");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::FileExtractor;
    use crate::web::protocol::StudyMode;
    use crate::web::state::test_app_state;
    use async_trait::async_trait;
    use flashcard_core::domain::FileData;
    use flashcard_core::error::GenerationError;
    use flashcard_core::ports::FlashcardGenerationService;

    struct NoGenerator;

    #[async_trait]
    impl FlashcardGenerationService for NoGenerator {
        async fn generate_flashcards(&self, _file: &FileData, _max_cards: usize) -> Result<Vec<Flashcard>, GenerationError> {
            Ok(Vec::new())
        }
    }

    fn set_json(id: &str, name: &str, prefix: &str) -> String {
        serde_json::json!({
            "id": id,
            "name": name,
            "flashcards": [
                { "question": format!("{prefix}0?"), "answer": format!("{prefix}0") },
                { "question": format!("{prefix}1?"), "answer": format!("{prefix}1") },
            ],
        })
        .to_string()
    }

    /// A signed-in session holding sets A and B, studying A.
    async fn studying_a() -> (Arc<AppState>, String, String) {
        let state = test_app_state(Arc::new(FileExtractor::new()), Arc::new(NoGenerator));
        let mut app = state.app.lock().await;
        app.sign_up("a@x.com", "pw", "pw").unwrap();
        let a = app.import_set(&set_json("set-a", "A", "a")).unwrap();
        let b = app.import_set(&set_json("set-b", "B", "b")).unwrap();
        app.show_my_sets().unwrap();
        app.study_set(&a).unwrap();
        drop(app);
        (state, a, b)
    }

    fn stored_cards(app: &flashcard_core::FlashcardApp, set_id: &str) -> Vec<Flashcard> {
        let user = app.current_user().unwrap();
        user.sets.iter().find(|s| s.id == set_id).unwrap().flashcards.clone()
    }

    #[tokio::test]
    async fn review_edit_is_written_back_to_the_active_list() {
        let (state, _, _) = studying_a().await;
        let study = Mutex::new(StudySession::new());

        process_message(&state, &study, ClientMessage::Start { mode: StudyMode::Study }).await;
        process_message(&state, &study, ClientMessage::BeginEdit).await;
        let outcome = process_message(
            &state,
            &study,
            ClientMessage::CommitEdit {
                question: "a0 fixed?".to_string(),
                answer: "yes".to_string(),
            },
        )
        .await;

        assert!(matches!(outcome.replies.as_slice(), [ServerMessage::Review { draft: None, .. }]));
        let app = state.app.lock().await;
        assert_eq!(app.session().active_flashcards[0], Flashcard::new("a0 fixed?", "yes"));
    }

    #[tokio::test]
    async fn edit_begun_on_one_set_never_lands_in_the_next() {
        let (state, _, b) = studying_a().await;
        let study = Mutex::new(StudySession::new());

        process_message(&state, &study, ClientMessage::Start { mode: StudyMode::Study }).await;
        process_message(&state, &study, ClientMessage::Next).await;
        process_message(&state, &study, ClientMessage::BeginEdit).await;

        {
            let mut app = state.app.lock().await;
            app.show_my_sets().unwrap();
            app.study_set(&b).unwrap();
        }

        let outcome = process_message(
            &state,
            &study,
            ClientMessage::CommitEdit {
                question: "a1 fixed?".to_string(),
                answer: "a1 fixed".to_string(),
            },
        )
        .await;

        // The edit is refused and the engine now shows B from the top.
        match outcome.replies.as_slice() {
            [ServerMessage::Error { .. }, ServerMessage::Review { cursor: 0, total: 2, card: Some(card), draft: None, .. }] => {
                assert_eq!(card, &Flashcard::new("b0?", "b0"));
            }
            other => panic!("unexpected replies: {:?}", other),
        }
        let app = state.app.lock().await;
        assert_eq!(app.session().active_flashcards[1], Flashcard::new("b1?", "b1"));
        assert_eq!(stored_cards(&app, &b)[1], Flashcard::new("b1?", "b1"));
        drop(app);

        // Edits made after the reload go to B.
        process_message(&state, &study, ClientMessage::BeginEdit).await;
        process_message(
            &state,
            &study,
            ClientMessage::CommitEdit {
                question: "b0 fixed?".to_string(),
                answer: "b0 fixed".to_string(),
            },
        )
        .await;
        let app = state.app.lock().await;
        assert_eq!(app.session().active_flashcards[0], Flashcard::new("b0 fixed?", "b0 fixed"));
    }

    #[tokio::test]
    async fn leaving_the_flashcards_view_stops_the_engine() {
        let (state, _, _) = studying_a().await;
        let study = Mutex::new(StudySession::new());

        process_message(&state, &study, ClientMessage::Start { mode: StudyMode::Match }).await;
        state.app.lock().await.show_my_sets().unwrap();

        let outcome = process_message(&state, &study, ClientMessage::Restart).await;
        assert!(matches!(
            outcome.replies.as_slice(),
            [ServerMessage::Error { .. }, ServerMessage::Error { .. }]
        ));
        assert!(study.lock().await.engine.is_none());

        let outcome = process_message(&state, &study, ClientMessage::Flip).await;
        assert!(matches!(outcome.replies.as_slice(), [ServerMessage::Error { .. }]));
    }
}

//! services/api/src/web/mismatch_task.rs
//!
//! The delayed clear of a Match Mode mismatch highlight.

use crate::web::{
    protocol::ServerMessage,
    state::{StudyEngine, StudySession},
    study::snapshot,
};
use axum::extract::ws::{Message, WebSocket};
use futures::{stream::SplitSink, SinkExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

pub type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// Serializes a server message and sends it as a text frame.
pub async fn send_message(ws_sender: &WsSender, message: &ServerMessage) -> bool {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize server message: {}", e);
            return false;
        }
    };
    ws_sender.lock().await.send(Message::Text(json.into())).await.is_ok()
}

/// Waits out the highlight, then clears the mismatch if `mismatch_token` is
/// still the board's current one. Returns the snapshot to push, if any.
///
/// Returns early without touching the board once `cancellation_token` fires.
pub async fn wait_and_clear(
    study_lock: &Mutex<StudySession>,
    delay: Duration,
    mismatch_token: u64,
    cancellation_token: CancellationToken,
) -> Option<ServerMessage> {
    tokio::select! {
        _ = cancellation_token.cancelled() => {
            debug!(mismatch_token, "Mismatch clear cancelled");
            return None;
        }
        _ = tokio::time::sleep(delay) => {}
    }

    let mut study = study_lock.lock().await;
    let cleared = match study.engine.as_mut() {
        Some(StudyEngine::Match(board)) => board.clear_mismatch(mismatch_token),
        _ => false,
    };
    if cleared {
        study.engine.as_ref().map(snapshot)
    } else {
        None
    }
}

async fn clear_after_delay(
    study_lock: Arc<Mutex<StudySession>>,
    ws_sender: WsSender,
    delay: Duration,
    mismatch_token: u64,
    cancellation_token: CancellationToken,
) {
    let Some(reply) = wait_and_clear(&study_lock, delay, mismatch_token, cancellation_token).await else {
        return;
    };
    if !send_message(&ws_sender, &reply).await {
        error!("Failed to send cleared match board.");
    }
}

/// Spawns `clear_after_delay` on the runtime.
pub fn spawn_clear(
    study_lock: Arc<Mutex<StudySession>>,
    ws_sender: WsSender,
    delay: Duration,
    mismatch_token: u64,
    cancellation_token: CancellationToken,
) {
    tokio::spawn(clear_after_delay(
        study_lock,
        ws_sender,
        delay,
        mismatch_token,
        cancellation_token,
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::protocol::{ClientMessage, StudyMode};
    use crate::web::study::{apply, start};
    use flashcard_core::domain::Flashcard;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// A board with a flagged mismatch, plus its token.
    fn mismatched_board() -> (Mutex<StudySession>, u64) {
        let mut rng = StdRng::seed_from_u64(9);
        let mut study = StudySession::new();
        let cards = vec![Flashcard::new("2+2?", "4"), Flashcard::new("Capital of France?", "Paris")];
        start(&mut study, StudyMode::Match, cards, &mut rng);
        let (q_slot, a_slot) = match study.engine.as_ref() {
            Some(StudyEngine::Match(board)) => (
                board.questions().iter().position(|i| i.card == 0).unwrap(),
                board.answers().iter().position(|i| i.card == 1).unwrap(),
            ),
            _ => unreachable!(),
        };
        apply(&mut study, ClientMessage::SelectQuestion { slot: q_slot }, &mut rng);
        let step = apply(&mut study, ClientMessage::SelectAnswer { slot: a_slot }, &mut rng);
        (Mutex::new(study), step.schedule_clear.unwrap())
    }

    #[tokio::test]
    async fn clears_the_highlight_after_the_delay() {
        let (study, token) = mismatched_board();
        let cancel = study.lock().await.cancellation_token.clone();
        let reply = wait_and_clear(&study, Duration::from_millis(10), token, cancel).await;
        assert!(matches!(reply, Some(ServerMessage::Match { mismatch: None, .. })));
    }

    #[tokio::test]
    async fn cancelled_timer_leaves_the_board_alone() {
        let (study, token) = mismatched_board();
        let cancel = study.lock().await.cancellation_token.clone();
        cancel.cancel();
        let reply = wait_and_clear(&study, Duration::from_secs(5), token, cancel).await;
        assert!(reply.is_none());
        let guard = study.lock().await;
        assert!(matches!(guard.engine, Some(StudyEngine::Match(ref b)) if b.mismatch().is_some()));
    }

    #[tokio::test]
    async fn stale_token_does_not_clear() {
        let (study, token) = mismatched_board();
        let cancel = CancellationToken::new();
        let reply = wait_and_clear(&study, Duration::from_millis(1), token + 1, cancel).await;
        assert!(reply.is_none());
    }
}

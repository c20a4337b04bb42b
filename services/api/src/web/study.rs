//! services/api/src/web/study.rs
//!
//! Applies study-channel messages to the connection's engine. This is kept free
//! of socket and lock handling so the handler only has to carry out the
//! returned `StudyStep`.

use crate::web::protocol::{ClientMessage, ServerMessage, StudyMode};
use crate::web::state::{StudyEngine, StudySession};
use flashcard_core::domain::Flashcard;
use flashcard_core::study::{MatchBoard, ReviewDeck, SelectOutcome, TestSession};
use rand::Rng;

/// What the handler must do after a message was applied.
#[derive(Debug, Default)]
pub struct StudyStep {
    pub reply: Option<ServerMessage>,
    /// A mismatch was flagged; clear it with this token after the delay.
    pub schedule_clear: Option<u64>,
    /// A review edit to write back into the active card list.
    pub write_back: Option<(usize, Flashcard)>,
}

impl StudyStep {
    fn reply(message: ServerMessage) -> Self {
        Self {
            reply: Some(message),
            ..Self::default()
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self::reply(ServerMessage::Error {
            message: message.into(),
        })
    }
}

/// Renders the engine as the message the client displays.
pub fn snapshot(engine: &StudyEngine) -> ServerMessage {
    match engine {
        StudyEngine::Review(deck) => ServerMessage::Review {
            cursor: deck.cursor(),
            total: deck.len(),
            flipped: deck.is_flipped(),
            card: deck.current().cloned(),
            draft: deck.draft().cloned(),
        },
        StudyEngine::Test(test) => ServerMessage::Test {
            position: test.position(),
            total: test.total(),
            score: test.score(),
            question: test.current().map(|c| c.question.clone()),
            phase: test.phase().clone(),
        },
        StudyEngine::Match(board) => ServerMessage::Match {
            questions: board.questions(),
            answers: board.answers(),
            matched: board.matched_count(),
            total: board.total(),
            mismatch: board.mismatch(),
            won: board.won(),
        },
    }
}

/// Replaces the engine with a fresh one over `cards`.
pub fn start<R: Rng + ?Sized>(study: &mut StudySession, mode: StudyMode, cards: Vec<Flashcard>, rng: &mut R) -> StudyStep {
    study.reset_timers();
    let engine = match mode {
        StudyMode::Study => StudyEngine::Review(ReviewDeck::new(cards)),
        StudyMode::Test => StudyEngine::Test(TestSession::new(cards, rng)),
        StudyMode::Match => StudyEngine::Match(MatchBoard::new(cards, rng)),
    };
    let reply = snapshot(&engine);
    study.engine = Some(engine);
    StudyStep::reply(reply)
}

/// Reloads the running engine, in its current mode, over a replaced card list.
pub fn reload<R: Rng + ?Sized>(study: &mut StudySession, cards: Vec<Flashcard>, rng: &mut R) -> StudyStep {
    study.reset_timers();
    match study.engine.as_mut() {
        Some(StudyEngine::Review(deck)) => deck.load(cards),
        Some(StudyEngine::Test(test)) => *test = TestSession::new(cards, rng),
        Some(StudyEngine::Match(board)) => *board = MatchBoard::new(cards, rng),
        None => return StudyStep::error("Choose a study mode first."),
    }
    StudyStep {
        reply: study.engine.as_ref().map(snapshot),
        ..StudyStep::default()
    }
}

/// Drops the engine and cancels its timers.
pub fn stop(study: &mut StudySession) {
    study.reset_timers();
    study.engine = None;
    study.card_list = None;
}

/// Applies every message except `Start`, which needs the app's card list.
pub fn apply<R: Rng + ?Sized>(study: &mut StudySession, message: ClientMessage, rng: &mut R) -> StudyStep {
    if matches!(message, ClientMessage::Restart) {
        study.reset_timers();
    }
    let Some(engine) = study.engine.as_mut() else {
        return StudyStep::error("Choose a study mode first.");
    };

    let mut step = StudyStep::default();
    match (engine, message) {
        (_, ClientMessage::Start { .. }) => return StudyStep::error("A study mode is already running."),

        (StudyEngine::Review(deck), ClientMessage::Flip) => deck.flip(),
        (StudyEngine::Review(deck), ClientMessage::Next) => deck.next(),
        (StudyEngine::Review(deck), ClientMessage::Prev) => deck.prev(),
        (StudyEngine::Review(deck), ClientMessage::BeginEdit) => deck.begin_edit(),
        (StudyEngine::Review(deck), ClientMessage::CommitEdit { question, answer }) => {
            step.write_back = deck.commit_edit(question, answer);
        }
        (StudyEngine::Review(deck), ClientMessage::CancelEdit) => deck.cancel_edit(),

        (StudyEngine::Test(test), ClientMessage::Submit { answer }) => {
            test.submit(&answer);
        }
        (StudyEngine::Test(test), ClientMessage::Advance) => test.advance(),
        (StudyEngine::Test(test), ClientMessage::Restart) => test.restart(rng),

        (StudyEngine::Match(board), ClientMessage::SelectQuestion { slot }) => {
            if let SelectOutcome::Mismatched { token } = board.select_question(slot) {
                step.schedule_clear = Some(token);
            }
        }
        (StudyEngine::Match(board), ClientMessage::SelectAnswer { slot }) => {
            if let SelectOutcome::Mismatched { token } = board.select_answer(slot) {
                step.schedule_clear = Some(token);
            }
        }
        (StudyEngine::Match(board), ClientMessage::Restart) => board.restart(rng),

        (_, other) => {
            return StudyStep::error(format!("{:?} does not apply to the current study mode.", other));
        }
    }

    step.reply = study.engine.as_ref().map(snapshot);
    step
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashcard_core::study::TestPhase;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn cards() -> Vec<Flashcard> {
        vec![Flashcard::new("2+2?", "4"), Flashcard::new("Capital of France?", "Paris")]
    }

    #[test]
    fn messages_before_start_are_errors() {
        let mut study = StudySession::new();
        let step = apply(&mut study, ClientMessage::Flip, &mut StdRng::seed_from_u64(1));
        assert!(matches!(step.reply, Some(ServerMessage::Error { .. })));
    }

    #[test]
    fn review_edit_is_handed_back_for_write_back() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut study = StudySession::new();
        start(&mut study, StudyMode::Study, cards(), &mut rng);
        apply(&mut study, ClientMessage::BeginEdit, &mut rng);
        let step = apply(
            &mut study,
            ClientMessage::CommitEdit {
                question: "3+3?".to_string(),
                answer: "6".to_string(),
            },
            &mut rng,
        );
        assert_eq!(step.write_back, Some((0, Flashcard::new("3+3?", "6"))));
        assert!(matches!(
            step.reply,
            Some(ServerMessage::Review { card: Some(ref c), draft: None, .. }) if c.answer == "6"
        ));
    }

    #[test]
    fn wrong_mode_messages_are_rejected_without_state_change() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut study = StudySession::new();
        start(&mut study, StudyMode::Study, cards(), &mut rng);
        let step = apply(&mut study, ClientMessage::Submit { answer: "4".to_string() }, &mut rng);
        assert!(matches!(step.reply, Some(ServerMessage::Error { .. })));
    }

    #[test]
    fn test_mode_runs_to_a_summary() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut study = StudySession::new();
        start(&mut study, StudyMode::Test, cards(), &mut rng);
        for _ in 0..2 {
            let answer = match study.engine.as_ref() {
                Some(StudyEngine::Test(test)) => test.current().unwrap().answer.clone(),
                _ => unreachable!(),
            };
            apply(&mut study, ClientMessage::Submit { answer }, &mut rng);
            apply(&mut study, ClientMessage::Advance, &mut rng);
        }
        let reply = study.engine.as_ref().map(snapshot).unwrap();
        assert!(matches!(
            reply,
            ServerMessage::Test { phase: TestPhase::Finished { score: 2, total: 2 }, .. }
        ));
    }

    #[test]
    fn match_mismatch_requests_a_timed_clear() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut study = StudySession::new();
        start(&mut study, StudyMode::Match, cards(), &mut rng);
        let (q_slot, a_slot) = match study.engine.as_ref() {
            Some(StudyEngine::Match(board)) => (
                board.questions().iter().position(|i| i.card == 0).unwrap(),
                board.answers().iter().position(|i| i.card == 1).unwrap(),
            ),
            _ => unreachable!(),
        };
        apply(&mut study, ClientMessage::SelectQuestion { slot: q_slot }, &mut rng);
        let step = apply(&mut study, ClientMessage::SelectAnswer { slot: a_slot }, &mut rng);
        assert!(step.schedule_clear.is_some());
    }

    #[test]
    fn restart_cancels_pending_timers() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut study = StudySession::new();
        start(&mut study, StudyMode::Match, cards(), &mut rng);
        let before = study.cancellation_token.clone();
        apply(&mut study, ClientMessage::Restart, &mut rng);
        assert!(before.is_cancelled());
        assert!(!study.cancellation_token.is_cancelled());
    }

    #[test]
    fn reload_resets_review_position_and_edit() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut study = StudySession::new();
        start(&mut study, StudyMode::Study, cards(), &mut rng);
        apply(&mut study, ClientMessage::Next, &mut rng);
        apply(&mut study, ClientMessage::BeginEdit, &mut rng);

        let step = reload(&mut study, vec![Flashcard::new("b0", "b0")], &mut rng);
        assert_eq!(
            step.reply,
            Some(ServerMessage::Review {
                cursor: 0,
                total: 1,
                flipped: false,
                card: Some(Flashcard::new("b0", "b0")),
                draft: None,
            })
        );
    }

    #[test]
    fn reload_keeps_the_mode_and_stop_clears_it() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut study = StudySession::new();
        start(&mut study, StudyMode::Match, cards(), &mut rng);
        let before = study.cancellation_token.clone();
        let step = reload(&mut study, vec![Flashcard::new("b0", "b0")], &mut rng);
        assert!(matches!(step.reply, Some(ServerMessage::Match { total: 1, .. })));
        assert!(before.is_cancelled());

        stop(&mut study);
        assert!(study.engine.is_none());
        let step = apply(&mut study, ClientMessage::Restart, &mut rng);
        assert!(matches!(step.reply, Some(ServerMessage::Error { .. })));
    }

    #[test]
    fn client_messages_use_snake_case_tags() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"select_answer","slot":2}"#).unwrap();
        assert_eq!(msg, ClientMessage::SelectAnswer { slot: 2 });
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"start","mode":"match"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Start { mode: StudyMode::Match });
    }
}

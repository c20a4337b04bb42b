//! Match mode: two shuffled columns, one of questions and one of answers.
//!
//! Items are tracked by card index so duplicate texts stay distinguishable; a
//! pair is correct when the question's canonical answer equals the selected
//! answer's text. A wrong pair is flagged as a mismatch until the caller clears
//! it with the token it was issued, normally after `MISMATCH_CLEAR_DELAY`.

use rand::Rng;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

use super::shuffled_indices;
use crate::domain::Flashcard;

pub const MISMATCH_CLEAR_DELAY: Duration = Duration::from_secs(1);

/// A wrong pair on display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub question: usize,
    pub answer: usize,
    pub token: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    /// Already matched, flagged, or out of range.
    Ignored,
    /// Waiting for the other side.
    Selected,
    Matched { won: bool },
    /// Schedule `clear_mismatch(token)`.
    Mismatched { token: u64 },
}

/// One cell of a column as the UI renders it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchItem {
    pub card: usize,
    pub text: String,
    pub selected: bool,
    pub matched: bool,
    pub mismatched: bool,
}

#[derive(Debug, Clone)]
pub struct MatchBoard {
    cards: Vec<Flashcard>,
    question_order: Vec<usize>,
    answer_order: Vec<usize>,
    selected_question: Option<usize>,
    selected_answer: Option<usize>,
    /// question card index -> answer card index
    matched: HashMap<usize, usize>,
    mismatched: Option<Mismatch>,
    next_token: u64,
    won: bool,
}

impl MatchBoard {
    pub fn new<R: Rng + ?Sized>(cards: Vec<Flashcard>, rng: &mut R) -> Self {
        let mut board = Self {
            cards,
            question_order: Vec::new(),
            answer_order: Vec::new(),
            selected_question: None,
            selected_answer: None,
            matched: HashMap::new(),
            mismatched: None,
            next_token: 0,
            won: false,
        };
        board.restart(rng);
        board
    }

    /// Reshuffles both columns and clears every selection and match.
    /// Tokens issued before the restart no longer clear anything.
    pub fn restart<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.question_order = shuffled_indices(self.cards.len(), rng);
        self.answer_order = shuffled_indices(self.cards.len(), rng);
        self.selected_question = None;
        self.selected_answer = None;
        self.matched.clear();
        self.mismatched = None;
        self.next_token += 1;
        self.won = false;
    }

    pub fn won(&self) -> bool {
        self.won
    }

    pub fn matched_count(&self) -> usize {
        self.matched.len()
    }

    pub fn total(&self) -> usize {
        self.cards.len()
    }

    pub fn mismatch(&self) -> Option<Mismatch> {
        self.mismatched
    }

    fn question_resolved(&self, card: usize) -> bool {
        self.matched.contains_key(&card)
    }

    fn answer_resolved(&self, card: usize) -> bool {
        self.matched.values().any(|&a| a == card)
    }

    /// Selects the question shown at `slot` in the question column.
    pub fn select_question(&mut self, slot: usize) -> SelectOutcome {
        let Some(&card) = self.question_order.get(slot) else {
            return SelectOutcome::Ignored;
        };
        if self.question_resolved(card) || self.mismatched.is_some_and(|m| m.question == card) {
            return SelectOutcome::Ignored;
        }
        self.selected_question = Some(card);
        self.resolve()
    }

    /// Selects the answer shown at `slot` in the answer column.
    pub fn select_answer(&mut self, slot: usize) -> SelectOutcome {
        let Some(&card) = self.answer_order.get(slot) else {
            return SelectOutcome::Ignored;
        };
        if self.answer_resolved(card) || self.mismatched.is_some_and(|m| m.answer == card) {
            return SelectOutcome::Ignored;
        }
        self.selected_answer = Some(card);
        self.resolve()
    }

    fn resolve(&mut self) -> SelectOutcome {
        let (Some(question), Some(answer)) = (self.selected_question, self.selected_answer) else {
            return SelectOutcome::Selected;
        };
        self.selected_question = None;
        self.selected_answer = None;

        if self.cards[question].answer == self.cards[answer].answer {
            self.matched.insert(question, answer);
            self.won = self.matched.len() == self.cards.len();
            SelectOutcome::Matched { won: self.won }
        } else {
            let token = self.next_token;
            self.next_token += 1;
            self.mismatched = Some(Mismatch { question, answer, token });
            SelectOutcome::Mismatched { token }
        }
    }

    /// Clears the mismatch flag if `token` is still the current one.
    pub fn clear_mismatch(&mut self, token: u64) -> bool {
        if self.mismatched.is_some_and(|m| m.token == token) {
            self.mismatched = None;
            true
        } else {
            false
        }
    }

    pub fn questions(&self) -> Vec<MatchItem> {
        self.question_order
            .iter()
            .map(|&card| MatchItem {
                card,
                text: self.cards[card].question.clone(),
                selected: self.selected_question == Some(card),
                matched: self.question_resolved(card),
                mismatched: self.mismatched.is_some_and(|m| m.question == card),
            })
            .collect()
    }

    pub fn answers(&self) -> Vec<MatchItem> {
        self.answer_order
            .iter()
            .map(|&card| MatchItem {
                card,
                text: self.cards[card].answer.clone(),
                selected: self.selected_answer == Some(card),
                matched: self.answer_resolved(card),
                mismatched: self.mismatched.is_some_and(|m| m.answer == card),
            })
            .collect()
    }
}

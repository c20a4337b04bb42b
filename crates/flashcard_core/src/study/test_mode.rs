//! Test mode: a shuffled quiz graded on free-text answers.
//!
//! Answers are compared after trimming and lowercasing both sides. Nothing else
//! is normalized, so punctuation still counts.

use rand::Rng;
use serde::Serialize;

use super::shuffled_indices;
use crate::domain::Flashcard;

/// The verdict on one submitted answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grade {
    pub submitted: String,
    pub correct_answer: String,
    pub correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum TestPhase {
    Answering,
    Graded(Grade),
    Finished { score: usize, total: usize },
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

pub fn answers_match(expected: &str, submitted: &str) -> bool {
    normalize(expected) == normalize(submitted)
}

#[derive(Debug, Clone)]
pub struct TestSession {
    cards: Vec<Flashcard>,
    order: Vec<usize>,
    cursor: usize,
    score: usize,
    phase: TestPhase,
}

impl TestSession {
    pub fn new<R: Rng + ?Sized>(cards: Vec<Flashcard>, rng: &mut R) -> Self {
        let mut session = Self {
            cards,
            order: Vec::new(),
            cursor: 0,
            score: 0,
            phase: TestPhase::Answering,
        };
        session.restart(rng);
        session
    }

    /// Reshuffles and resets every counter.
    pub fn restart<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.order = shuffled_indices(self.cards.len(), rng);
        self.cursor = 0;
        self.score = 0;
        self.phase = if self.cards.is_empty() {
            TestPhase::Finished { score: 0, total: 0 }
        } else {
            TestPhase::Answering
        };
    }

    pub fn phase(&self) -> &TestPhase {
        &self.phase
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn total(&self) -> usize {
        self.cards.len()
    }

    /// Zero-based position within this run.
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// The card being asked, unless the test is finished.
    pub fn current(&self) -> Option<&Flashcard> {
        if matches!(self.phase, TestPhase::Finished { .. }) {
            return None;
        }
        self.order.get(self.cursor).and_then(|&i| self.cards.get(i))
    }

    /// Grades an answer. Blank input, or input outside `Answering`, is ignored.
    pub fn submit(&mut self, text: &str) -> Option<&Grade> {
        if self.phase != TestPhase::Answering || text.trim().is_empty() {
            return None;
        }
        let card = self.current()?;
        let correct = answers_match(&card.answer, text);
        let grade = Grade {
            submitted: text.to_string(),
            correct_answer: card.answer.clone(),
            correct,
        };
        if correct {
            self.score += 1;
        }
        self.phase = TestPhase::Graded(grade);
        match &self.phase {
            TestPhase::Graded(grade) => Some(grade),
            _ => None,
        }
    }

    /// Moves past a graded card, finishing after the last one.
    pub fn advance(&mut self) {
        if !matches!(self.phase, TestPhase::Graded(_)) {
            return;
        }
        if self.cursor + 1 < self.order.len() {
            self.cursor += 1;
            self.phase = TestPhase::Answering;
        } else {
            self.phase = TestPhase::Finished {
                score: self.score,
                total: self.total(),
            };
        }
    }
}

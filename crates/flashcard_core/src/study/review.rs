//! Review mode: a saturating cursor over the cards with flip and in-place edit.

use serde::Serialize;

use crate::domain::Flashcard;

/// The question/answer text being edited, not yet applied to the card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditDraft {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewDeck {
    cards: Vec<Flashcard>,
    cursor: usize,
    flipped: bool,
    draft: Option<EditDraft>,
}

impl ReviewDeck {
    pub fn new(cards: Vec<Flashcard>) -> Self {
        Self {
            cards,
            cursor: 0,
            flipped: false,
            draft: None,
        }
    }

    /// Swaps in a new card list and resets cursor, flip and edit state.
    pub fn load(&mut self, cards: Vec<Flashcard>) {
        *self = Self::new(cards);
    }

    pub fn cards(&self) -> &[Flashcard] {
        &self.cards
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    pub fn is_editing(&self) -> bool {
        self.draft.is_some()
    }

    pub fn draft(&self) -> Option<&EditDraft> {
        self.draft.as_ref()
    }

    pub fn current(&self) -> Option<&Flashcard> {
        self.cards.get(self.cursor)
    }

    fn move_to(&mut self, cursor: usize) {
        if cursor != self.cursor {
            self.cursor = cursor;
            self.flipped = false;
            self.draft = None;
        }
    }

    pub fn next(&mut self) {
        let last = self.cards.len().saturating_sub(1);
        self.move_to((self.cursor + 1).min(last));
    }

    pub fn prev(&mut self) {
        self.move_to(self.cursor.saturating_sub(1));
    }

    /// Ignored while editing.
    pub fn flip(&mut self) {
        if self.draft.is_none() && !self.cards.is_empty() {
            self.flipped = !self.flipped;
        }
    }

    /// Opens an edit draft seeded from the current card. Only the question side can
    /// be edited from, so this is ignored while flipped.
    pub fn begin_edit(&mut self) {
        if self.flipped || self.draft.is_some() {
            return;
        }
        if let Some(card) = self.current() {
            self.draft = Some(EditDraft {
                question: card.question.clone(),
                answer: card.answer.clone(),
            });
        }
    }

    /// Replaces the current card with the given text and leaves edit mode.
    ///
    /// Returns the position and new card so the caller can write it back, or
    /// `None` if no edit was in progress.
    pub fn commit_edit(&mut self, question: impl Into<String>, answer: impl Into<String>) -> Option<(usize, Flashcard)> {
        self.draft.take()?;
        let card = Flashcard::new(question, answer);
        let slot = self.cards.get_mut(self.cursor)?;
        *slot = card.clone();
        self.flipped = false;
        Some((self.cursor, card))
    }

    /// Discards the draft; the card is left untouched.
    pub fn cancel_edit(&mut self) {
        self.draft = None;
    }
}

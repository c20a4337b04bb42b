//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol of the study channel between the
//! browser client and the server.

use flashcard_core::domain::Flashcard;
use flashcard_core::study::{EditDraft, MatchItem, Mismatch, TestPhase};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StudyMode {
    Study,
    Test,
    Match,
}

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Loads the active card list into the chosen engine. Must come first.
    Start { mode: StudyMode },

    // --- review ---
    Flip,
    Next,
    Prev,
    BeginEdit,
    CommitEdit { question: String, answer: String },
    CancelEdit,

    // --- test ---
    Submit { answer: String },
    Advance,

    // --- test and match ---
    Restart,

    // --- match ---
    SelectQuestion { slot: usize },
    SelectAnswer { slot: usize },
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// A full snapshot of the engine after every message, plus errors.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Review {
        cursor: usize,
        total: usize,
        flipped: bool,
        card: Option<Flashcard>,
        draft: Option<EditDraft>,
    },

    Test {
        position: usize,
        total: usize,
        score: usize,
        question: Option<String>,
        phase: TestPhase,
    },

    Match {
        questions: Vec<MatchItem>,
        answers: Vec<MatchItem>,
        matched: usize,
        total: usize,
        mismatch: Option<Mismatch>,
        won: bool,
    },

    /// Reports a recoverable problem; the connection stays open.
    Error { message: String },
}

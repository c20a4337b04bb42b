//! crates/flashcard_core/src/domain.rs
//!
//! Defines the core data structures for the application.
//! The whole `Session` is persisted as a single JSON blob, so every type here
//! carries serde derives with the camelCase field names of the stored format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single question/answer card. Identity within a set is its position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub question: String,
    pub answer: String,
}

impl Flashcard {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// A named, ordered collection of flashcards owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardSet {
    pub id: String,
    pub name: String,
    pub flashcards: Vec<Flashcard>,
    pub created_at: DateTime<Utc>,
}

/// The stored credential. Compared byte-for-byte, never normalized.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialSecret(String);

impl CredentialSecret {
    pub fn from_password(password: &str) -> Self {
        Self(password.to_string())
    }

    pub fn matches(&self, password: &str) -> bool {
        self.0 == password
    }
}

// Keep secrets out of logs and debug dumps.
impl fmt::Debug for CredentialSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CredentialSecret(***)")
    }
}

/// An account. `email` is the unique key across all users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub email: String,
    pub credential_secret: CredentialSecret,
    #[serde(default)]
    pub sets: Vec<FlashcardSet>,
}

/// The top-level view the user is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum View {
    Auth,
    Upload,
    Flashcards,
    MySets,
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            View::Auth => "auth",
            View::Upload => "upload",
            View::Flashcards => "flashcards",
            View::MySets => "mySets",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// The full application snapshot: accounts, active user, current view and
/// the working card list.
///
/// `current_user` and `editing_set` are lookup keys into `users`, resolved on
/// demand, so they can never drift from the stored records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub view: View,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub current_user: Option<String>,
    #[serde(default)]
    pub active_flashcards: Vec<Flashcard>,
    #[serde(default)]
    pub editing_set: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            view: View::Auth,
            theme: Theme::Dark,
            users: Vec::new(),
            current_user: None,
            active_flashcards: Vec::new(),
            editing_set: None,
        }
    }
}

/// A raw file handed to the extraction adapter.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Lowercased extension of the file name, if any.
    pub fn extension(&self) -> Option<String> {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }
}

/// Extracted content ready for the generation service. For images `content`
/// is a base64 payload; for everything else it is plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileData {
    pub content: String,
    pub mime_type: String,
}

impl FileData {
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_session_starts_signed_out_in_dark_theme() {
        let session = Session::default();
        assert_eq!(session.view, View::Auth);
        assert_eq!(session.theme, Theme::Dark);
        assert!(session.users.is_empty());
        assert!(session.current_user.is_none());
        assert!(session.active_flashcards.is_empty());
        assert!(session.editing_set.is_none());
    }

    #[test]
    fn session_serializes_with_camel_case_views() {
        let session = Session {
            view: View::MySets,
            ..Session::default()
        };
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["view"], "mySets");
        assert_eq!(json["theme"], "dark");
        assert!(json["activeFlashcards"].is_array());
    }

    #[test]
    fn credential_secret_is_exact_match_and_hidden_in_debug() {
        let secret = CredentialSecret::from_password("p1");
        assert!(secret.matches("p1"));
        assert!(!secret.matches("P1"));
        assert!(!secret.matches("p1 "));
        assert_eq!(format!("{:?}", secret), "CredentialSecret(***)");
    }

    #[test]
    fn uploaded_file_extension_is_lowercased() {
        let file = UploadedFile {
            file_name: "Notes.PDF".to_string(),
            mime_type: "application/pdf".to_string(),
            bytes: Vec::new(),
        };
        assert_eq!(file.extension().as_deref(), Some("pdf"));
    }
}

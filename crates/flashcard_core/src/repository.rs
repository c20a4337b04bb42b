//! crates/flashcard_core/src/repository.rs
//!
//! Pure operations over the `users` collection. Each takes the snapshot by value
//! and returns the next one; none of them keep hidden state.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{Flashcard, FlashcardSet, User};
use crate::error::ValidationError;

/// Mints an id that no set in `existing` already uses.
fn mint_set_id(existing: &[FlashcardSet]) -> String {
    loop {
        let id = Uuid::new_v4().to_string();
        if !existing.iter().any(|s| s.id == id) {
            return id;
        }
    }
}

/// Applies `f` to the owner's record. Returns the input untouched when the owner is absent.
fn with_owner(mut users: Vec<User>, owner_email: &str, f: impl FnOnce(&mut User)) -> Vec<User> {
    if let Some(user) = users.iter_mut().find(|u| u.email == owner_email) {
        f(user);
    }
    users
}

pub fn find_user<'a>(users: &'a [User], email: &str) -> Option<&'a User> {
    users.iter().find(|u| u.email == email)
}

pub fn find_set<'a>(users: &'a [User], owner_email: &str, set_id: &str) -> Option<&'a FlashcardSet> {
    find_user(users, owner_email).and_then(|u| u.sets.iter().find(|s| s.id == set_id))
}

/// Appends a new set with a fresh id. No-op for an empty card list or unknown owner.
pub fn create_set(users: Vec<User>, owner_email: &str, name: &str, cards: Vec<Flashcard>) -> Vec<User> {
    if cards.is_empty() {
        return users;
    }
    with_owner(users, owner_email, |user| {
        let set = FlashcardSet {
            id: mint_set_id(&user.sets),
            name: name.to_string(),
            flashcards: cards,
            created_at: Utc::now(),
        };
        debug!(set_id = %set.id, owner = %user.email, "Created flashcard set");
        user.sets.push(set);
    })
}

/// Replaces name and cards of an existing set, keeping its id and creation time.
pub fn update_set(
    users: Vec<User>,
    owner_email: &str,
    set_id: &str,
    name: &str,
    cards: Vec<Flashcard>,
) -> Vec<User> {
    if cards.is_empty() {
        return users;
    }
    with_owner(users, owner_email, |user| {
        if let Some(set) = user.sets.iter_mut().find(|s| s.id == set_id) {
            set.name = name.to_string();
            set.flashcards = cards;
        }
    })
}

pub fn delete_set(users: Vec<User>, owner_email: &str, set_id: &str) -> Vec<User> {
    with_owner(users, owner_email, |user| user.sets.retain(|s| s.id != set_id))
}

/// Serializes a set in the share format, which is also the import format.
pub fn export_set(set: &FlashcardSet) -> String {
    // A struct of strings, a Vec and a timestamp always serializes.
    serde_json::to_string(set).unwrap_or_default()
}

fn required_str(object: &serde_json::Map<String, Value>, field: &'static str) -> Result<String, ValidationError> {
    match object.get(field).and_then(Value::as_str) {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        _ => Err(ValidationError::MissingField(field)),
    }
}

/// Validates a share payload into a set, without touching any user.
pub fn parse_set_payload(raw: &str) -> Result<FlashcardSet, ValidationError> {
    let value: Value = serde_json::from_str(raw).map_err(|e| ValidationError::MalformedJson(e.to_string()))?;
    let object = value.as_object().ok_or(ValidationError::NotAnObject)?;

    let id = required_str(object, "id")?;
    let name = required_str(object, "name")?;

    let raw_cards = object
        .get("flashcards")
        .and_then(Value::as_array)
        .ok_or(ValidationError::NotASequence)?;
    let flashcards = raw_cards
        .iter()
        .enumerate()
        .map(|(index, card)| {
            let question = card.get("question").and_then(Value::as_str);
            let answer = card.get("answer").and_then(Value::as_str);
            match (question, answer) {
                (Some(q), Some(a)) => Ok(Flashcard::new(q, a)),
                _ => Err(ValidationError::InvalidCard(index)),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    let created_at = object
        .get("createdAt")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    Ok(FlashcardSet {
        id,
        name,
        flashcards,
        created_at,
    })
}

/// Validates and appends an external set. A colliding id is replaced by a fresh one.
///
/// Returns the next snapshot and the id the set was stored under.
pub fn import_set(users: Vec<User>, owner_email: &str, raw: &str) -> Result<(Vec<User>, String), ValidationError> {
    let mut set = parse_set_payload(raw)?;
    if find_user(&users, owner_email).is_none() {
        return Err(ValidationError::UnknownOwner(owner_email.to_string()));
    }
    let users = with_owner(users, owner_email, |user| {
        if user.sets.iter().any(|s| s.id == set.id) {
            let fresh = mint_set_id(&user.sets);
            debug!(old = %set.id, new = %fresh, "Imported set id collided; reassigned");
            set.id = fresh;
        }
        user.sets.push(set.clone());
    });
    Ok((users, set.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CredentialSecret;

    fn user(email: &str) -> User {
        User {
            email: email.to_string(),
            credential_secret: CredentialSecret::from_password("pw"),
            sets: Vec::new(),
        }
    }

    fn cards() -> Vec<Flashcard> {
        vec![Flashcard::new("2+2?", "4"), Flashcard::new("Capital of France?", "Paris")]
    }

    #[test]
    fn create_set_appends_to_owner_only() {
        let users = vec![user("a@x.com"), user("b@x.com")];
        let users = create_set(users, "a@x.com", "Math", cards());
        assert_eq!(users[0].sets.len(), 1);
        assert_eq!(users[0].sets[0].name, "Math");
        assert_eq!(users[0].sets[0].flashcards, cards());
        assert!(users[1].sets.is_empty());
    }

    #[test]
    fn create_set_is_noop_for_empty_cards_or_unknown_owner() {
        let users = vec![user("a@x.com")];
        let same = create_set(users.clone(), "a@x.com", "Empty", Vec::new());
        assert_eq!(same, users);
        let same = create_set(users.clone(), "nobody@x.com", "Math", cards());
        assert_eq!(same, users);
    }

    #[test]
    fn two_created_sets_never_share_an_id() {
        let users = vec![user("a@x.com")];
        let users = create_set(users, "a@x.com", "One", cards());
        let users = create_set(users, "a@x.com", "Two", cards());
        assert_ne!(users[0].sets[0].id, users[0].sets[1].id);
    }

    #[test]
    fn delete_set_removes_matching_id_and_ignores_unknown() {
        let users = create_set(vec![user("a@x.com")], "a@x.com", "Math", cards());
        let id = users[0].sets[0].id.clone();
        let unchanged = delete_set(users.clone(), "a@x.com", "missing");
        assert_eq!(unchanged, users);
        let users = delete_set(users, "a@x.com", &id);
        assert!(users[0].sets.is_empty());
    }

    #[test]
    fn update_set_keeps_id_and_created_at() {
        let users = create_set(vec![user("a@x.com")], "a@x.com", "Math", cards());
        let before = users[0].sets[0].clone();
        let users = update_set(users, "a@x.com", &before.id, "Maths", vec![Flashcard::new("1+1?", "2")]);
        let after = &users[0].sets[0];
        assert_eq!(after.id, before.id);
        assert_eq!(after.created_at, before.created_at);
        assert_eq!(after.name, "Maths");
        assert_eq!(after.flashcards, vec![Flashcard::new("1+1?", "2")]);
    }

    #[test]
    fn export_then_import_round_trips_into_another_account() {
        let users = create_set(vec![user("a@x.com"), user("b@x.com")], "a@x.com", "Math", cards());
        let original = users[0].sets[0].clone();
        let payload = export_set(&original);

        let (users, id) = import_set(users, "b@x.com", &payload).unwrap();
        assert_eq!(id, original.id);
        assert_eq!(users[1].sets[0], original);
    }

    #[test]
    fn import_with_colliding_id_mints_a_new_one() {
        let users = create_set(vec![user("a@x.com")], "a@x.com", "Math", cards());
        let original = users[0].sets[0].clone();
        let (users, id) = import_set(users, "a@x.com", &export_set(&original)).unwrap();
        assert_ne!(id, original.id);
        assert_eq!(users[0].sets.len(), 2);
        assert_eq!(users[0].sets[1].id, id);
        assert_eq!(users[0].sets[1].name, original.name);
        assert_eq!(users[0].sets[1].flashcards, original.flashcards);
    }

    #[test]
    fn import_rejects_malformed_payloads() {
        let users = vec![user("a@x.com")];
        let cases = [
            ("not json", "MalformedJson"),
            ("[1,2]", "NotAnObject"),
            (r#"{"name":"x","flashcards":[]}"#, "MissingField(\"id\")"),
            (r#"{"id":"1","name":"","flashcards":[]}"#, "MissingField(\"name\")"),
            (r#"{"id":"1","name":"x","flashcards":{}}"#, "NotASequence"),
            (r#"{"id":"1","name":"x","flashcards":[{"question":"q"}]}"#, "InvalidCard(0)"),
        ];
        for (payload, expected) in cases {
            let err = import_set(users.clone(), "a@x.com", payload).unwrap_err();
            assert!(format!("{:?}", err).starts_with(expected), "{payload}: {err:?}");
        }
    }

    #[test]
    fn import_for_unknown_owner_is_rejected() {
        let users = vec![user("a@x.com")];
        let payload = r#"{"id":"1","name":"x","flashcards":[{"question":"q","answer":"a"}]}"#;
        let err = import_set(users, "ghost@x.com", payload).unwrap_err();
        assert_eq!(err, ValidationError::UnknownOwner("ghost@x.com".to_string()));
    }

    #[test]
    fn import_without_created_at_is_accepted() {
        let (users, id) = import_set(
            vec![user("a@x.com")],
            "a@x.com",
            r#"{"id":"shared-1","name":"Shared","flashcards":[{"question":"q","answer":"a"}]}"#,
        )
        .unwrap();
        assert_eq!(id, "shared-1");
        assert_eq!(users[0].sets[0].flashcards, vec![Flashcard::new("q", "a")]);
    }
}

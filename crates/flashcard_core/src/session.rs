//! crates/flashcard_core/src/session.rs
//!
//! The session/navigation state machine. `FlashcardApp` owns the `Session`
//! snapshot and routes every mutation through `update_state`, which merges a
//! `SessionPatch` and persists the full result before returning.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::auth;
use crate::domain::{Flashcard, FlashcardSet, Session, User, View};
use crate::error::{FlashcardError, FlashcardResult, GenerationError, ValidationError};
use crate::ports::{PortResult, SnapshotStore};
use crate::repository;

//=========================================================================================
// Partial Updates
//=========================================================================================

/// The fields to change in one `update_state` call. `None` leaves a field as is.
#[derive(Debug, Default)]
pub struct SessionPatch {
    pub view: Option<View>,
    pub theme: Option<crate::domain::Theme>,
    pub users: Option<Vec<User>>,
    pub current_user: Option<Option<String>>,
    pub active_flashcards: Option<Vec<Flashcard>>,
    pub editing_set: Option<Option<String>>,
}

impl SessionPatch {
    /// A view change that also drops the scratch card list.
    fn enter_clean(view: View) -> Self {
        Self {
            view: Some(view),
            active_flashcards: Some(Vec::new()),
            editing_set: Some(None),
            ..Self::default()
        }
    }
}

impl Session {
    fn merge(self, patch: SessionPatch) -> Session {
        Session {
            view: patch.view.unwrap_or(self.view),
            theme: patch.theme.unwrap_or(self.theme),
            users: patch.users.unwrap_or(self.users),
            current_user: patch.current_user.unwrap_or(self.current_user),
            active_flashcards: patch.active_flashcards.unwrap_or(self.active_flashcards),
            editing_set: patch.editing_set.unwrap_or(self.editing_set),
        }
    }
}

/// Issued when a file upload starts; a result is only applied if its ticket is
/// still current when it comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationTicket {
    epoch: u64,
    upload: u64,
}

/// Identifies one card list loaded into the session. Any replacement of the list
/// retires it; in-place card edits do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardListTicket {
    epoch: u64,
}

//=========================================================================================
// The Application State Machine
//=========================================================================================

pub struct FlashcardApp {
    session: Session,
    store: Arc<dyn SnapshotStore>,
    /// Incremented on every view change.
    view_epoch: u64,
    /// Incremented whenever `active_flashcards` is replaced.
    card_list_epoch: u64,
    /// The sequence number of the most recent upload.
    latest_upload: u64,
    persistence_degraded: bool,
}

impl FlashcardApp {
    /// Loads the stored session, falling back to defaults on absence or corruption.
    pub fn load(store: Arc<dyn SnapshotStore>) -> Self {
        let session = match store.load() {
            Ok(Some(session)) => {
                info!(users = session.users.len(), view = %session.view, "Restored stored session");
                session
            }
            Ok(None) => {
                info!("No stored session; starting fresh");
                Session::default()
            }
            Err(e) => {
                warn!("Failed to load stored session, using defaults: {}", e);
                Session::default()
            }
        };
        let mut app = Self {
            session,
            store,
            view_epoch: 0,
            card_list_epoch: 0,
            latest_upload: 0,
            persistence_degraded: false,
        };
        app.drop_dangling_login();
        app
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn view(&self) -> View {
        self.session.view
    }

    /// True once a save has failed; the session then lives in memory only.
    pub fn persistence_degraded(&self) -> bool {
        self.persistence_degraded
    }

    /// Writes the current snapshot once so an unwritable store is found before
    /// the first user action. A failure degrades to memory only.
    pub fn check_store(&mut self) -> PortResult<()> {
        if let Err(e) = self.store.save(&self.session) {
            error!("Session store rejected a write; continuing in memory only: {}", e);
            self.persistence_degraded = true;
            return Err(e);
        }
        Ok(())
    }

    /// Resolves the logged-in account from the authoritative `users` list.
    pub fn current_user(&self) -> Option<&User> {
        self.session
            .current_user
            .as_deref()
            .and_then(|email| repository::find_user(&self.session.users, email))
    }

    /// Resolves the set being studied, if it still exists.
    pub fn editing_set(&self) -> Option<&FlashcardSet> {
        let owner = self.session.current_user.as_deref()?;
        let set_id = self.session.editing_set.as_deref()?;
        repository::find_set(&self.session.users, owner, set_id)
    }

    /// The current card list's identity, captured by study engines that copy it.
    pub fn card_list_ticket(&self) -> CardListTicket {
        CardListTicket {
            epoch: self.card_list_epoch,
        }
    }

    /// The single choke point for mutation: merge, then persist the full snapshot.
    pub fn update_state(&mut self, patch: SessionPatch) {
        let replaces_list = patch.active_flashcards.is_some();
        self.apply_patch(patch, replaces_list);
    }

    fn apply_patch(&mut self, patch: SessionPatch, replaces_list: bool) {
        if patch.view.is_some_and(|v| v != self.session.view) {
            self.view_epoch += 1;
        }
        if replaces_list {
            self.card_list_epoch += 1;
        }
        let current = std::mem::take(&mut self.session);
        self.session = current.merge(patch);

        if self.persistence_degraded {
            return;
        }
        if let Err(e) = self.store.save(&self.session) {
            error!("Failed to persist session; continuing in memory only: {}", e);
            self.persistence_degraded = true;
        }
    }

    /// A stored login whose account no longer exists is dropped back to `auth`.
    fn drop_dangling_login(&mut self) {
        let dangling = self.session.current_user.is_some() && self.current_user().is_none();
        let signed_out_elsewhere = self.session.current_user.is_none() && self.session.view != View::Auth;
        if dangling || signed_out_elsewhere {
            warn!("Stored session had no valid login; returning to auth");
            self.update_state(SessionPatch {
                current_user: Some(None),
                ..SessionPatch::enter_clean(View::Auth)
            });
        }
    }

    fn require_view(&self, allowed: &[View], action: &'static str) -> FlashcardResult<()> {
        if allowed.contains(&self.session.view) {
            Ok(())
        } else {
            Err(FlashcardError::InvalidTransition {
                view: self.session.view,
                action,
            })
        }
    }

    fn require_user(&self) -> FlashcardResult<String> {
        self.current_user()
            .map(|u| u.email.clone())
            .ok_or(FlashcardError::NotSignedIn)
    }

    //-------------------------------------------------------------------------------------
    // auth
    //-------------------------------------------------------------------------------------

    pub fn sign_up(&mut self, email: &str, password: &str, confirm_password: &str) -> FlashcardResult<()> {
        self.require_view(&[View::Auth], "sign up")?;
        let users = auth::sign_up(self.session.users.clone(), email, password, confirm_password)?;
        info!(email, "Account created");
        self.update_state(SessionPatch {
            users: Some(users),
            current_user: Some(Some(email.to_string())),
            ..SessionPatch::enter_clean(View::Upload)
        });
        Ok(())
    }

    pub fn sign_in(&mut self, email: &str, password: &str) -> FlashcardResult<()> {
        self.require_view(&[View::Auth], "sign in")?;
        let user = auth::sign_in(&self.session.users, email, password)?;
        let email = user.email.clone();
        info!(email = %email, "Signed in");
        self.update_state(SessionPatch {
            current_user: Some(Some(email)),
            ..SessionPatch::enter_clean(View::Upload)
        });
        Ok(())
    }

    pub fn request_password_reset(&self, email: &str) -> FlashcardResult<String> {
        self.require_view(&[View::Auth], "reset a password")?;
        Ok(auth::request_password_reset(&self.session.users, email)?)
    }

    /// Valid from any view. Accounts stay; only the login and scratch state go.
    pub fn logout(&mut self) {
        self.update_state(SessionPatch {
            current_user: Some(None),
            ..SessionPatch::enter_clean(View::Auth)
        });
    }

    pub fn toggle_theme(&mut self) {
        let theme = self.session.theme.toggled();
        self.update_state(SessionPatch {
            theme: Some(theme),
            ..SessionPatch::default()
        });
    }

    //-------------------------------------------------------------------------------------
    // upload
    //-------------------------------------------------------------------------------------

    /// Starts a file upload. Clears the working list and captures the current view epoch.
    pub fn begin_generation(&mut self) -> FlashcardResult<GenerationTicket> {
        self.require_user()?;
        self.require_view(&[View::Upload], "upload a file")?;
        self.latest_upload += 1;
        self.update_state(SessionPatch {
            active_flashcards: Some(Vec::new()),
            ..SessionPatch::default()
        });
        Ok(GenerationTicket {
            epoch: self.view_epoch,
            upload: self.latest_upload,
        })
    }

    /// Applies the outcome of an upload started with `begin_generation`.
    ///
    /// Results for a ticket issued before the last view change, or before a newer
    /// upload started, are discarded. An empty card list keeps the user in `upload`
    /// with `GenerationError::NoCards`.
    pub fn complete_generation(
        &mut self,
        ticket: GenerationTicket,
        outcome: FlashcardResult<Vec<Flashcard>>,
    ) -> FlashcardResult<usize> {
        if ticket.epoch != self.view_epoch || self.session.view != View::Upload {
            warn!(
                ticket_epoch = ticket.epoch,
                current_epoch = self.view_epoch,
                "Discarding generation result for a stale upload"
            );
            return Err(FlashcardError::StaleGeneration);
        }
        if ticket.upload != self.latest_upload {
            warn!(
                upload = ticket.upload,
                latest = self.latest_upload,
                "Discarding generation result superseded by a newer upload"
            );
            return Err(FlashcardError::SupersededGeneration);
        }
        let cards = outcome?;
        if cards.is_empty() {
            return Err(GenerationError::NoCards.into());
        }
        let count = cards.len();
        info!(count, "Flashcards generated");
        self.update_state(SessionPatch {
            view: Some(View::Flashcards),
            active_flashcards: Some(cards),
            editing_set: Some(None),
            ..SessionPatch::default()
        });
        Ok(count)
    }

    //-------------------------------------------------------------------------------------
    // flashcards
    //-------------------------------------------------------------------------------------

    /// Replaces one card of the working list in place.
    pub fn update_active_card(&mut self, index: usize, card: Flashcard) -> FlashcardResult<()> {
        self.require_view(&[View::Flashcards], "edit a card")?;
        if index >= self.session.active_flashcards.len() {
            return Err(FlashcardError::CardOutOfRange(index));
        }
        let mut cards = self.session.active_flashcards.clone();
        cards[index] = card;
        self.apply_patch(
            SessionPatch {
                active_flashcards: Some(cards),
                ..SessionPatch::default()
            },
            false,
        );
        Ok(())
    }

    /// Writes back an edit made on a copy of the card list, provided that copy is
    /// still the list the session holds.
    pub fn write_back_card(&mut self, ticket: CardListTicket, index: usize, card: Flashcard) -> FlashcardResult<()> {
        if ticket != self.card_list_ticket() {
            warn!(index, "Rejecting an edit made against a replaced card list");
            return Err(FlashcardError::StaleCardList);
        }
        self.update_active_card(index, card)
    }

    /// Saves the working list. Studying an existing set updates it; otherwise a new
    /// set is created. Returns the id of the saved set.
    pub fn save_set(&mut self, name: &str) -> FlashcardResult<String> {
        self.require_view(&[View::Flashcards], "save a set")?;
        let owner = self.require_user()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        let cards = self.session.active_flashcards.clone();
        if cards.is_empty() {
            return Err(FlashcardError::NoActiveCards);
        }

        let users = self.session.users.clone();
        let (users, set_id) = match self.editing_set().map(|s| s.id.clone()) {
            Some(existing) => (repository::update_set(users, &owner, &existing, name, cards), existing),
            None => {
                let users = repository::create_set(users, &owner, name, cards);
                let id = repository::find_user(&users, &owner)
                    .and_then(|u| u.sets.last())
                    .map(|s| s.id.clone())
                    .ok_or(FlashcardError::NotSignedIn)?;
                (users, id)
            }
        };
        info!(set_id = %set_id, name, "Saved flashcard set");
        self.update_state(SessionPatch {
            users: Some(users),
            ..SessionPatch::enter_clean(View::MySets)
        });
        Ok(set_id)
    }

    pub fn create_new(&mut self) -> FlashcardResult<()> {
        self.require_user()?;
        self.require_view(&[View::Flashcards, View::MySets, View::Upload], "start a new set")?;
        self.update_state(SessionPatch::enter_clean(View::Upload));
        Ok(())
    }

    //-------------------------------------------------------------------------------------
    // mySets
    //-------------------------------------------------------------------------------------

    pub fn show_my_sets(&mut self) -> FlashcardResult<()> {
        self.require_user()?;
        self.require_view(&[View::Upload, View::Flashcards, View::MySets], "open your sets")?;
        self.update_state(SessionPatch::enter_clean(View::MySets));
        Ok(())
    }

    pub fn study_set(&mut self, set_id: &str) -> FlashcardResult<()> {
        self.require_view(&[View::MySets], "study a set")?;
        let owner = self.require_user()?;
        let set = repository::find_set(&self.session.users, &owner, set_id)
            .ok_or_else(|| FlashcardError::SetNotFound(set_id.to_string()))?;
        let cards = set.flashcards.clone();
        self.update_state(SessionPatch {
            view: Some(View::Flashcards),
            active_flashcards: Some(cards),
            editing_set: Some(Some(set_id.to_string())),
            ..SessionPatch::default()
        });
        Ok(())
    }

    pub fn delete_set(&mut self, set_id: &str) -> FlashcardResult<()> {
        let owner = self.require_user()?;
        if repository::find_set(&self.session.users, &owner, set_id).is_none() {
            return Err(FlashcardError::SetNotFound(set_id.to_string()));
        }
        let users = repository::delete_set(self.session.users.clone(), &owner, set_id);
        info!(set_id, "Deleted flashcard set");
        self.update_state(SessionPatch {
            users: Some(users),
            ..SessionPatch::default()
        });
        Ok(())
    }

    /// Imports a shared set and returns the id it was stored under.
    pub fn import_set(&mut self, raw: &str) -> FlashcardResult<String> {
        let owner = self.require_user()?;
        let (users, set_id) = repository::import_set(self.session.users.clone(), &owner, raw)?;
        info!(set_id = %set_id, "Imported flashcard set");
        self.update_state(SessionPatch {
            users: Some(users),
            ..SessionPatch::default()
        });
        Ok(set_id)
    }

    pub fn export_set(&self, set_id: &str) -> FlashcardResult<String> {
        let owner = self.require_user()?;
        repository::find_set(&self.session.users, &owner, set_id)
            .map(repository::export_set)
            .ok_or_else(|| FlashcardError::SetNotFound(set_id.to_string()))
    }
}

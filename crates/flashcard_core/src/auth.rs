//! crates/flashcard_core/src/auth.rs
//!
//! Account rules over the `users` collection. Credentials are opaque strings
//! compared exactly; there is no hashing here.

use crate::domain::{CredentialSecret, User};
use crate::error::AuthError;
use crate::repository::find_user;

/// Registers a new account and returns the next snapshot.
pub fn sign_up(
    mut users: Vec<User>,
    email: &str,
    password: &str,
    confirm_password: &str,
) -> Result<Vec<User>, AuthError> {
    if password != confirm_password {
        return Err(AuthError::PasswordMismatch);
    }
    if find_user(&users, email).is_some() {
        return Err(AuthError::DuplicateEmail);
    }
    users.push(User {
        email: email.to_string(),
        credential_secret: CredentialSecret::from_password(password),
        sets: Vec::new(),
    });
    Ok(users)
}

/// Checks an email/password pair. Unknown email and wrong password are indistinguishable.
pub fn sign_in<'a>(users: &'a [User], email: &str, password: &str) -> Result<&'a User, AuthError> {
    find_user(users, email)
        .filter(|u| u.credential_secret.matches(password))
        .ok_or(AuthError::InvalidCredentials)
}

/// Simulated password recovery: only confirms the account exists.
pub fn request_password_reset(users: &[User], email: &str) -> Result<String, AuthError> {
    find_user(users, email)
        .map(|u| format!("Password reset instructions sent to {}. (This is a simulation).", u.email))
        .ok_or(AuthError::UnknownEmail)
}

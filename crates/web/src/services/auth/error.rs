//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] orange_collar_core::EmailError),

    /// No account for this email.
    #[error("unknown email")]
    UnknownEmail,

    /// The email exists but the password did not verify.
    #[error("invalid password")]
    InvalidPassword,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Password and confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// The flash message shown to the visitor, or `None` for internal errors.
    #[must_use]
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::InvalidEmail(e) => Some(format!("Invalid email: {e}.")),
            Self::UnknownEmail => Some(
                "You are not in our database. Check your email and password or sign up!".to_owned(),
            ),
            Self::InvalidPassword => {
                Some("Password was not valid. Try again or contact an admin.".to_owned())
            }
            Self::UserAlreadyExists => Some(
                "That email already exists. Please sign in or contact an admin.".to_owned(),
            ),
            Self::WeakPassword(reason) => Some(format!("Password too weak: {reason}.")),
            Self::PasswordMismatch => Some("Passwords must match.".to_owned()),
            Self::UserNotFound | Self::Repository(_) | Self::PasswordHash => None,
        }
    }
}

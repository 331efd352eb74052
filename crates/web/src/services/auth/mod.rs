//! Authentication service.
//!
//! Password sign-up, login and password changes, hashed with Argon2id.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use orange_collar_core::{ContactPreferences, Email, PhoneNumber, UserId};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::user::{NewUser, ProfileUpdate, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Everything collected by the sign-up form.
#[derive(Debug)]
pub struct Registration<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub confirm_password: &'a str,
    pub name: String,
    pub primary_phone: PhoneNumber,
    pub secondary_phone: PhoneNumber,
    pub primary_address: String,
    pub preferences: ContactPreferences,
    pub pet_watch: bool,
}

/// A profile edit before the new password is hashed.
#[derive(Debug)]
pub struct ProfileEdit<'a> {
    pub password: &'a str,
    pub confirm_password: &'a str,
    pub name: Option<String>,
    pub primary_phone: Option<PhoneNumber>,
    pub secondary_phone: Option<PhoneNumber>,
    pub primary_address: Option<String>,
    pub secondary_address: Option<String>,
    pub preferences: ContactPreferences,
    pub pet_watch: bool,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new account. Contact timestamps start at `now`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::PasswordMismatch` or `AuthError::WeakPassword` if
    /// the password is rejected.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip_all, fields(email = %registration.email))]
    pub async fn register(
        &self,
        registration: &Registration<'_>,
        now: DateTime<Utc>,
    ) -> Result<User, AuthError> {
        let email = Email::parse(registration.email)?;
        let password_hash =
            hash_new_password(registration.password, registration.confirm_password)?;

        let new_user = NewUser {
            email,
            name: registration.name.trim().to_owned(),
            password_hash,
            primary_phone: registration.primary_phone.clone(),
            secondary_phone: registration.secondary_phone.clone(),
            primary_address: registration.primary_address.trim().to_owned(),
            preferences: registration.preferences,
            pet_watch: registration.pet_watch,
            signed_up_at: now,
        };

        let user = self.users.create(&new_user).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
            other => AuthError::Repository(other),
        })?;

        tracing::info!(user_id = %user.id, "account created");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnknownEmail` if no account uses the email.
    /// Returns `AuthError::InvalidPassword` if the password is wrong.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::UnknownEmail)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Apply a profile edit, replacing the password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PasswordMismatch` or `AuthError::WeakPassword` if
    /// the new password is rejected.
    /// Returns `AuthError::UserNotFound` if the account no longer exists.
    #[instrument(skip(self, edit))]
    pub async fn update_profile(
        &self,
        user_id: UserId,
        edit: &ProfileEdit<'_>,
    ) -> Result<User, AuthError> {
        let password_hash = hash_new_password(edit.password, edit.confirm_password)?;

        let update = ProfileUpdate {
            name: edit.name.clone(),
            primary_phone: edit.primary_phone.clone(),
            secondary_phone: edit.secondary_phone.clone(),
            primary_address: edit.primary_address.clone(),
            secondary_address: edit.secondary_address.clone(),
            preferences: edit.preferences,
            pet_watch: edit.pet_watch,
            password_hash,
        };

        self.users
            .update_profile(user_id, &update)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })
    }
}

/// Check a new password and its confirmation, then hash it.
fn hash_new_password(password: &str, confirm: &str) -> Result<String, AuthError> {
    if password != confirm {
        return Err(AuthError::PasswordMismatch);
    }
    validate_password(password)?;
    hash_password(password)
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidPassword)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidPassword)
}

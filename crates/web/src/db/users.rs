//! User repository for database operations.
//!
//! Queries are checked at runtime (`query_as` + `FromRow`) so the crate
//! builds without a live database.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use orange_collar_core::{
    ContactPreferences, ContactTimestamps, Email, PhoneNumber, UserId,
};

use super::RepositoryError;
use crate::models::user::{NewUser, ProfileUpdate, User};

/// Columns selected for every [`User`].
const USER_COLUMNS: &str = "id, email, name, primary_phone, secondary_phone, \
     primary_address, secondary_address, allow_sms, allow_mms, allow_voice, pet_watch, \
     last_sms, last_mms, last_call, created_at, updated_at";

/// Row shape of the `users` table.
#[derive(Debug, sqlx::FromRow)]
#[allow(clippy::struct_excessive_bools)]
struct UserRow {
    id: i32,
    email: String,
    name: String,
    primary_phone: String,
    secondary_phone: String,
    primary_address: String,
    secondary_address: String,
    allow_sms: bool,
    allow_mms: bool,
    allow_voice: bool,
    pet_watch: bool,
    last_sms: DateTime<Utc>,
    last_mms: DateTime<Utc>,
    last_call: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// A user row joined with its password hash.
#[derive(Debug, sqlx::FromRow)]
struct UserWithPasswordRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            email,
            name: row.name,
            primary_phone: PhoneNumber::new(row.primary_phone),
            secondary_phone: PhoneNumber::new(row.secondary_phone),
            primary_address: row.primary_address,
            secondary_address: row.secondary_address,
            preferences: ContactPreferences {
                allow_sms: row.allow_sms,
                allow_mms: row.allow_mms,
                allow_voice: row.allow_voice,
            },
            pet_watch: row.pet_watch,
            contact: ContactTimestamps {
                last_sms: row.last_sms,
                last_mms: row.last_mms,
                last_call: row.last_call,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored email is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(User::try_from).transpose()
    }

    /// Get a user together with their password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let sql = format!("SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = $1");
        let row = sqlx::query_as::<_, UserWithPasswordRow>(&sql)
            .bind(email)
            .fetch_optional(self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some((User::try_from(row.user)?, row.password_hash)))
    }

    /// Create a new user.
    ///
    /// All three contact timestamps start at `signed_up_at`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, new_user: &NewUser) -> Result<User, RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO users (
                email, name, password_hash, primary_phone, secondary_phone,
                primary_address, allow_sms, allow_mms, allow_voice, pet_watch,
                last_sms, last_mms, last_call
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11, $11)
            RETURNING {USER_COLUMNS}
            "
        );

        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(&new_user.email)
            .bind(&new_user.name)
            .bind(&new_user.password_hash)
            .bind(&new_user.primary_phone)
            .bind(&new_user.secondary_phone)
            .bind(&new_user.primary_address)
            .bind(new_user.preferences.allow_sms)
            .bind(new_user.preferences.allow_mms)
            .bind(new_user.preferences.allow_voice)
            .bind(new_user.pet_watch)
            .bind(new_user.signed_up_at)
            .fetch_one(self.pool)
            .await
            .map_err(|e| RepositoryError::from_insert(e, "email"))?;

        User::try_from(row)
    }

    /// Apply a profile edit.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<User, RepositoryError> {
        let sql = format!(
            r"
            UPDATE users SET
                name = COALESCE($2, name),
                primary_phone = COALESCE($3, primary_phone),
                secondary_phone = COALESCE($4, secondary_phone),
                primary_address = COALESCE($5, primary_address),
                secondary_address = COALESCE($6, secondary_address),
                allow_sms = $7,
                allow_mms = $8,
                allow_voice = $9,
                pet_watch = $10,
                password_hash = $11,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "
        );

        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(update.name.as_deref())
            .bind(update.primary_phone.as_ref())
            .bind(update.secondary_phone.as_ref())
            .bind(update.primary_address.as_deref())
            .bind(update.secondary_address.as_deref())
            .bind(update.preferences.allow_sms)
            .bind(update.preferences.allow_mms)
            .bind(update.preferences.allow_voice)
            .bind(update.pet_watch)
            .bind(&update.password_hash)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        User::try_from(row)
    }

    /// Persist the contact timestamps after a sighting dispatch.
    ///
    /// All three columns are written in one statement. `GREATEST` keeps each
    /// column non-decreasing even if two reports race, and the stored values
    /// are returned.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn record_contact(
        &self,
        id: UserId,
        stamps: &ContactTimestamps,
    ) -> Result<ContactTimestamps, RepositoryError> {
        let row: Option<(DateTime<Utc>, DateTime<Utc>, DateTime<Utc>)> = sqlx::query_as(
            r"
            UPDATE users SET
                last_sms = GREATEST(last_sms, $2),
                last_mms = GREATEST(last_mms, $3),
                last_call = GREATEST(last_call, $4)
            WHERE id = $1
            RETURNING last_sms, last_mms, last_call
            ",
        )
        .bind(id)
        .bind(stamps.last_sms)
        .bind(stamps.last_mms)
        .bind(stamps.last_call)
        .fetch_optional(self.pool)
        .await?;

        let (last_sms, last_mms, last_call) = row.ok_or(RepositoryError::NotFound)?;
        Ok(ContactTimestamps {
            last_sms,
            last_mms,
            last_call,
        })
    }
}

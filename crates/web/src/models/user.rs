//! User domain types.

use chrono::{DateTime, Utc};

use orange_collar_core::{ContactPreferences, ContactTimestamps, Email, PhoneNumber, UserId};

/// A registered owner.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login email.
    pub email: Email,
    /// Display name.
    pub name: String,
    /// Main contact number used for sighting notifications.
    pub primary_phone: PhoneNumber,
    /// Backup number, shown on the profile only.
    pub secondary_phone: PhoneNumber,
    /// Home address.
    pub primary_address: String,
    /// Alternate address.
    pub secondary_address: String,
    /// Channels the owner agreed to be contacted on.
    pub preferences: ContactPreferences,
    /// Opted in to hear about pets sighted nearby.
    pub pet_watch: bool,
    /// When the owner was last contacted on each channel.
    pub contact: ContactTimestamps,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether a sighting can reach this owner at all.
    #[must_use]
    pub fn has_contact_info(&self) -> bool {
        !self.primary_phone.is_empty()
    }
}

/// Fields for a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub name: String,
    pub password_hash: String,
    pub primary_phone: PhoneNumber,
    pub secondary_phone: PhoneNumber,
    pub primary_address: String,
    pub preferences: ContactPreferences,
    pub pet_watch: bool,
    /// Seeds all three contact timestamps.
    pub signed_up_at: DateTime<Utc>,
}

/// A profile edit.
///
/// `None` leaves the stored value unchanged; channel flags and the password
/// are always written because the edit form always submits them.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub primary_phone: Option<PhoneNumber>,
    pub secondary_phone: Option<PhoneNumber>,
    pub primary_address: Option<String>,
    pub secondary_address: Option<String>,
    pub preferences: ContactPreferences,
    pub pet_watch: bool,
    pub password_hash: String,
}

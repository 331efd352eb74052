//! Pet domain types.

use chrono::{DateTime, Utc};

use orange_collar_core::{PetId, PetStatus, UserId};

/// A registered pet.
#[derive(Debug, Clone)]
pub struct Pet {
    /// Unique pet ID.
    pub id: PetId,
    /// Owning user. Always refers to an existing user.
    pub user_id: UserId,
    pub name: String,
    pub species: String,
    pub color: String,
    pub breed: String,
    pub gender: String,
    pub description: String,
    pub indoor_pet: bool,
    pub status: PetStatus,
    /// File name of the uploaded picture, relative to the images directory.
    pub picture: Option<String>,
    pub home_address: String,
    /// When the pet was registered.
    pub created_at: DateTime<Utc>,
}

/// Fields for registering a pet.
#[derive(Debug, Clone)]
pub struct NewPet {
    pub user_id: UserId,
    pub name: String,
    pub species: String,
    pub color: String,
    pub breed: String,
    pub gender: String,
    pub description: String,
    pub indoor_pet: bool,
    pub status: PetStatus,
    pub home_address: String,
}

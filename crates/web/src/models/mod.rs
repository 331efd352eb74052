//! Domain models for Orange Collar.
//!
//! These are validated domain objects, separate from the database row types
//! in [`crate::db`].

pub mod pet;
pub mod session;
pub mod user;

pub use pet::{NewPet, Pet};
pub use session::{CurrentUser, keys as session_keys};
pub use user::{NewUser, ProfileUpdate, User};

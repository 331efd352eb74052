//! Core types for Orange Collar.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod contact;
pub mod email;
pub mod id;
pub mod phone;
pub mod status;

pub use contact::{
    ContactChannel, ContactPreferences, ContactTimestamps, StampPolicy, StampPolicyError,
};
pub use email::{Email, EmailError};
pub use id::*;
pub use phone::PhoneNumber;
pub use status::{PetStatus, PetStatusError};

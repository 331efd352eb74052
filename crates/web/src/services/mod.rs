//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Sign-up, login and profile changes
//! - `sighting` - Sighting reports: notification policy and dispatch
//! - `telephony` - Contact channel gateway (Twilio)
//! - `uploads` - Pet picture storage

pub mod auth;
pub mod sighting;
pub mod telephony;
pub mod uploads;

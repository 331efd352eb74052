//! Orange Collar Core - Shared domain types.
//!
//! This crate provides the types shared by the Orange Collar components:
//! - `web` - Pet registry and sighting report site
//! - `cli` - Command-line tools for migrations and operator tasks
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, emails, phone numbers, pet
//!   statuses and owner contact preferences

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

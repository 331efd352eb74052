//! Orange Collar web application library.
//!
//! Pet registry and sighting reports. The binary in `main.rs` wires these
//! modules into an axum server; the CLI and integration tests use them
//! directly.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET       /                          - Home page
//! GET       /health, /health/ready     - Liveness / readiness (in main)
//!
//! # Accounts
//! GET|POST  /login                     - Login (rate limited)
//! GET|POST  /signup                    - Sign up (rate limited)
//! GET       /logout                    - Logout
//! GET       /dashboard                 - The user and their pets
//! GET|POST  /edit                      - Edit profile
//!
//! # Pets
//! GET|POST  /new_user_pet              - Register a pet
//! GET|POST  /image-upload/{pet_id}     - Upload a pet picture
//! GET       /pet_profile/{pet_id}      - Pet profile
//! POST      /pet_profile/{pet_id}      - Report a sighting (rate limited)
//! POST      /pet_profile/{pet_id}/status - Change a pet's status (owner only)
//!
//! # Telephony callback
//! GET|POST  /calltemplate.xml/{pet_id} - TwiML call document
//! ```

pub mod account;
pub mod auth;
pub mod call_template;
pub mod home;
pub mod pets;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    response::Redirect,
    routing::{get, post},
};
use tower_sessions::Session;

use crate::error::AppError;
use crate::middleware::{Flash, auth_rate_limiter, push_flash, sighting_rate_limiter, take_flashes};
use crate::models::CurrentUser;
use crate::state::AppState;

/// Largest accepted picture upload.
const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Data every page template needs for the layout.
pub struct PageContext {
    /// Product name shown in the header and title.
    pub app_name: String,
    /// Logged-in user, if any.
    pub user: Option<CurrentUser>,
    /// Pending flash messages (already cleared from the session).
    pub flashes: Vec<Flash>,
}

impl PageContext {
    /// Collect the layout data, consuming pending flash messages.
    pub async fn load(state: &AppState, session: &Session, user: Option<CurrentUser>) -> Self {
        Self {
            app_name: state.config().app_name.clone(),
            user,
            flashes: take_flashes(session).await,
        }
    }

    /// Add a message to this render without going through the session.
    #[must_use]
    pub fn with_flash(mut self, flash: Flash) -> Self {
        self.flashes.push(flash);
        self
    }
}

/// Queue a flash message and redirect.
///
/// # Errors
///
/// Returns `AppError::Session` if the session cannot be written.
pub async fn flash_redirect(
    session: &Session,
    flash: Flash,
    to: &str,
) -> Result<Redirect, AppError> {
    push_flash(session, flash).await?;
    Ok(Redirect::to(to))
}

/// `Some(trimmed)` for non-blank input, `None` otherwise.
pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// HTML checkboxes are only submitted when ticked.
pub(crate) const fn checked(value: Option<&String>) -> bool {
    value.is_some()
}

/// Accept a redirect target only if it stays on this site.
pub(crate) fn safe_next(next: Option<&str>, fallback: &'static str) -> String {
    match next.map(str::trim) {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.starts_with("/\\")
                && !path.contains(['\r', '\n']) =>
        {
            path.to_owned()
        }
        _ => fallback.to_owned(),
    }
}

/// Login and sign-up, behind the auth rate limiter.
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/signup", get(auth::signup_page).post(auth::signup))
        .layer(auth_rate_limiter())
}

/// Sighting reports, behind the sighting rate limiter.
fn sighting_routes() -> Router<AppState> {
    Router::new()
        .route("/pet_profile/{pet_id}", post(pets::report_sighting))
        .layer(sighting_rate_limiter())
}

/// Create all routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/index", get(home::home))
        .merge(auth_routes())
        .route("/logout", get(auth::logout))
        .route("/dashboard", get(account::dashboard))
        .route("/edit", get(account::edit_page).post(account::edit))
        .route(
            "/new_user_pet",
            get(pets::new_pet_page).post(pets::new_pet),
        )
        .route(
            "/image-upload/{pet_id}",
            get(pets::upload_page)
                .post(pets::upload)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/pet_profile/{pet_id}", get(pets::profile))
        .route("/pet_profile/{pet_id}/status", post(pets::update_status))
        .merge(sighting_routes())
        .route(
            "/calltemplate.xml/{pet_id}",
            get(call_template::call_template).post(call_template::call_template),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next_accepts_local_paths() {
        assert_eq!(safe_next(Some("/pet_profile/3"), "/dashboard"), "/pet_profile/3");
    }

    #[test]
    fn test_safe_next_rejects_offsite_targets() {
        for target in ["https://evil.example", "//evil.example", "/\\evil", "dashboard", ""] {
            assert_eq!(safe_next(Some(target), "/dashboard"), "/dashboard", "{target}");
        }
        assert_eq!(safe_next(None, "/dashboard"), "/dashboard");
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  Pat ")), Some("Pat".to_owned()));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }
}

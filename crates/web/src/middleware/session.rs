//! Session middleware configuration.
//!
//! Sessions live in `PostgreSQL` (tower-sessions). A normal login lasts for
//! the browser session; "remember me" keeps it for 30 days of inactivity.

use sqlx::PgPool;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, Session, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::WebConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "oc_session";

/// Remembered sessions expire after 30 days without a request.
const REMEMBER_ME_DAYS: i64 = 30;

/// Create the session layer with `PostgreSQL` store.
///
/// The session table is created by migration, not at runtime.
#[must_use]
pub fn create_session_layer(pool: &PgPool, config: &WebConfig) -> SessionManagerLayer<PostgresStore> {
    let store = PostgresStore::new(pool.clone());

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnSessionEnd)
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Expiry for a freshly logged-in session.
#[must_use]
pub fn login_expiry(remember: bool) -> Expiry {
    if remember {
        Expiry::OnInactivity(Duration::days(REMEMBER_ME_DAYS))
    } else {
        Expiry::OnSessionEnd
    }
}

/// Apply the login expiry to `session`.
pub fn remember_session(session: &Session, remember: bool) {
    session.set_expiry(Some(login_expiry(remember)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remember_me_extends_expiry() {
        assert_eq!(
            login_expiry(true),
            Expiry::OnInactivity(Duration::days(30))
        );
        assert_eq!(login_expiry(false), Expiry::OnSessionEnd);
    }
}

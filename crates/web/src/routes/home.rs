//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tower_sessions::Session;

use crate::filters;
use crate::middleware::OptionalAuth;
use crate::routes::PageContext;
use crate::state::AppState;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub page: PageContext,
}

/// Display the home page.
pub async fn home(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> IndexTemplate {
    IndexTemplate {
        page: PageContext::load(&state, &session, user).await,
    }
}

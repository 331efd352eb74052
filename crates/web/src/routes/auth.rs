//! Authentication route handlers: login, logout and sign-up.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;

use orange_collar_core::{ContactPreferences, PhoneNumber};

use crate::error::{AppError, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{
    Flash, OptionalAuth, clear_current_user, push_flash, remember_session, set_current_user,
};
use crate::models::{CurrentUser, User};
use crate::routes::{PageContext, checked, flash_redirect, non_blank, safe_next};
use crate::services::auth::{AuthError, AuthService, Registration};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub remember_me: Option<String>,
    pub next: Option<String>,
}

/// Sign-up form data.
#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub primary_phone: String,
    #[serde(default)]
    pub primary_address: String,
    #[serde(default)]
    pub secondary_phone: String,
    pub allow_sms: Option<String>,
    pub allow_mms: Option<String>,
    pub allow_voice: Option<String>,
    pub pet_watch: Option<String>,
}

/// `?next=` target after a form succeeds.
#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub next: String,
}

/// Sign-up page template.
#[derive(Template, WebTemplate)]
#[template(path = "signup.html")]
pub struct SignupTemplate {
    pub page: PageContext,
}

// =============================================================================
// Form mapping
// =============================================================================

/// Map the sign-up form onto a registration request, field by field.
fn registration_from_form(form: &SignupForm) -> Registration<'_> {
    Registration {
        email: &form.email,
        password: &form.password,
        confirm_password: &form.confirm_password,
        name: form.name.trim().to_owned(),
        primary_phone: PhoneNumber::new(&form.primary_phone),
        secondary_phone: PhoneNumber::new(&form.secondary_phone),
        primary_address: form.primary_address.trim().to_owned(),
        preferences: ContactPreferences {
            allow_sms: checked(form.allow_sms.as_ref()),
            allow_mms: checked(form.allow_mms.as_ref()),
            allow_voice: checked(form.allow_voice.as_ref()),
        },
        pet_watch: checked(form.pet_watch.as_ref()),
    }
}

/// The session identity for a user.
fn current_user_of(user: &User) -> CurrentUser {
    CurrentUser {
        id: user.id,
        email: user.email.clone(),
        name: user.name.clone(),
    }
}

/// Put `user` in the session and tag Sentry with them.
async fn log_in(session: &Session, user: &User, remember: bool) -> Result<(), AppError> {
    set_current_user(session, &current_user_of(user)).await?;
    remember_session(session, remember);
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page. Logged-in users go home.
pub async fn login_page(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<NextQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }

    LoginTemplate {
        page: PageContext::load(&state, &session, None).await,
        next: safe_next(query.next.as_deref(), "/dashboard"),
    }
    .into_response()
}

/// Handle login form submission.
///
/// # Errors
///
/// Returns `AppError` on database or session failures. Bad credentials are
/// reported by flash message, not as errors.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<LoginForm>,
) -> Result<Redirect, AppError> {
    if user.is_some() {
        return Ok(Redirect::to("/"));
    }

    let auth = AuthService::new(state.pool());
    let user = match auth.login(&form.email, &form.password).await {
        Ok(user) => user,
        Err(e) => {
            let Some(message) = e.user_message() else {
                return Err(e.into());
            };
            tracing::info!(error = %e, "login rejected");
            return flash_redirect(&session, Flash::error(message), "/login").await;
        }
    };

    log_in(&session, &user, checked(form.remember_me.as_ref())).await?;
    add_breadcrumb("auth", "Logged in", None);
    tracing::info!(user_id = %user.id, "user logged in");

    let next = safe_next(form.next.as_deref(), "/dashboard");
    flash_redirect(
        &session,
        Flash::success(format!(
            "Successfully Logged In. Welcome back, {}!",
            user.name
        )),
        &next,
    )
    .await
}

/// Log out and go home.
///
/// # Errors
///
/// Returns `AppError::Session` if the session cannot be cleared.
pub async fn logout(session: Session) -> Result<Redirect, AppError> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    flash_redirect(&session, Flash::info("Logged out"), "/").await
}

// =============================================================================
// Sign-up Routes
// =============================================================================

/// Display the sign-up page.
pub async fn signup_page(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> SignupTemplate {
    SignupTemplate {
        page: PageContext::load(&state, &session, user).await,
    }
}

/// Handle sign-up form submission.
///
/// # Errors
///
/// Returns `AppError` on database, hashing or session failures.
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SignupForm>,
) -> Result<Redirect, AppError> {
    if non_blank(Some(form.name.as_str())).is_none() {
        return flash_redirect(&session, Flash::error("Please enter your name."), "/signup").await;
    }
    if PhoneNumber::new(&form.primary_phone).is_empty() {
        return flash_redirect(
            &session,
            Flash::error("A primary phone number is required."),
            "/signup",
        )
        .await;
    }

    let auth = AuthService::new(state.pool());
    let user = match auth
        .register(&registration_from_form(&form), Utc::now())
        .await
    {
        Ok(user) => user,
        Err(AuthError::UserAlreadyExists) => {
            let message = AuthError::UserAlreadyExists
                .user_message()
                .unwrap_or_default();
            return flash_redirect(&session, Flash::error(message), "/login").await;
        }
        Err(e) => {
            let Some(message) = e.user_message() else {
                return Err(e.into());
            };
            return flash_redirect(&session, Flash::error(message), "/signup").await;
        }
    };

    log_in(&session, &user, false).await?;
    push_flash(
        &session,
        Flash::success("Successfully created account. Welcome!"),
    )
    .await?;

    Ok(Redirect::to("/dashboard"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> SignupForm {
        SignupForm {
            name: " Pat ".into(),
            email: "pat@example.com".into(),
            password: "hunter2hunter2".into(),
            confirm_password: "hunter2hunter2".into(),
            primary_phone: " 5551234567 ".into(),
            primary_address: "12 Elm St".into(),
            secondary_phone: String::new(),
            allow_sms: Some("on".into()),
            allow_mms: None,
            allow_voice: Some("on".into()),
            pet_watch: None,
        }
    }

    #[test]
    fn test_registration_maps_every_field() {
        let form = form();
        let reg = registration_from_form(&form);

        assert_eq!(reg.email, "pat@example.com");
        assert_eq!(reg.name, "Pat");
        assert_eq!(reg.primary_phone.as_str(), "5551234567");
        assert!(reg.secondary_phone.is_empty());
        assert_eq!(reg.primary_address, "12 Elm St");
        assert_eq!(
            reg.preferences,
            ContactPreferences {
                allow_sms: true,
                allow_mms: false,
                allow_voice: true,
            }
        );
        assert!(!reg.pet_watch);
    }

    #[test]
    fn test_signup_form_decodes_unticked_boxes() {
        let body = "name=Pat&email=pat%40example.com&password=x&confirm_password=x\
                    &primary_phone=5551234567&allow_sms=on";
        let form: SignupForm = decode_form(body);
        assert!(checked(form.allow_sms.as_ref()));
        assert!(!checked(form.allow_voice.as_ref()));
        assert!(form.secondary_phone.is_empty());
    }

    fn decode_form<T: serde::de::DeserializeOwned>(body: &str) -> T {
        axum::extract::Query::<T>::try_from_uri(&format!("/?{body}").parse().unwrap())
            .unwrap()
            .0
    }
}

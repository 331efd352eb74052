//! Account route handlers.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use orange_collar_core::{ContactPreferences, PhoneNumber};

use crate::db::{PetRepository, UserRepository};
use crate::error::AppError;
use crate::filters;
use crate::middleware::{Flash, RequireAuth, clear_current_user};
use crate::models::{CurrentUser, Pet, User};
use crate::routes::{PageContext, checked, flash_redirect, non_blank};
use crate::services::auth::{AuthService, ProfileEdit};
use crate::state::AppState;

/// Profile edit form data.
#[derive(Debug, Deserialize)]
pub struct EditForm {
    pub name: Option<String>,
    pub password: String,
    pub confirm_password: String,
    pub primary_phone: Option<String>,
    pub secondary_phone: Option<String>,
    pub clear_primary_phone: Option<String>,
    pub clear_secondary_phone: Option<String>,
    pub primary_address: Option<String>,
    pub secondary_address: Option<String>,
    pub allow_sms: Option<String>,
    pub allow_mms: Option<String>,
    pub allow_voice: Option<String>,
    pub pet_watch: Option<String>,
}

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub page: PageContext,
    pub account: User,
    pub pets: Vec<Pet>,
}

/// Profile edit template.
#[derive(Template, WebTemplate)]
#[template(path = "edit_user.html")]
pub struct EditTemplate {
    pub page: PageContext,
    pub account: User,
}

/// Map the edit form onto a profile edit, field by field.
///
/// Blank text fields become `None` and leave the stored value alone.
/// A ticked clear box wins over whatever was typed.
fn phone_edit(value: Option<&str>, clear: Option<&String>) -> Option<PhoneNumber> {
    if checked(clear) {
        Some(PhoneNumber::default())
    } else {
        non_blank(value).map(PhoneNumber::new)
    }
}

fn profile_edit_from_form(form: &EditForm) -> ProfileEdit<'_> {
    ProfileEdit {
        password: &form.password,
        confirm_password: &form.confirm_password,
        name: non_blank(form.name.as_deref()),
        primary_phone: phone_edit(
            form.primary_phone.as_deref(),
            form.clear_primary_phone.as_ref(),
        ),
        secondary_phone: phone_edit(
            form.secondary_phone.as_deref(),
            form.clear_secondary_phone.as_ref(),
        ),
        primary_address: non_blank(form.primary_address.as_deref()),
        secondary_address: non_blank(form.secondary_address.as_deref()),
        preferences: ContactPreferences {
            allow_sms: checked(form.allow_sms.as_ref()),
            allow_mms: checked(form.allow_mms.as_ref()),
            allow_voice: checked(form.allow_voice.as_ref()),
        },
        pet_watch: checked(form.pet_watch.as_ref()),
    }
}

/// Load the account behind the session, or log out a stale session.
async fn load_account(
    state: &AppState,
    session: &Session,
    current: &CurrentUser,
) -> Result<Option<User>, AppError> {
    let account = UserRepository::new(state.pool()).get_by_id(current.id).await?;
    if account.is_none() {
        tracing::warn!(user_id = %current.id, "session refers to a missing user");
        clear_current_user(session).await?;
    }
    Ok(account)
}

/// Display the dashboard: the user and their pets.
///
/// # Errors
///
/// Returns `AppError::Database` if the account or pets cannot be loaded.
pub async fn dashboard(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
) -> Result<Response, AppError> {
    let Some(account) = load_account(&state, &session, &current).await? else {
        return Ok(Redirect::to("/login").into_response());
    };
    let pets = PetRepository::new(state.pool())
        .list_for_user(account.id)
        .await?;

    Ok(DashboardTemplate {
        page: PageContext::load(&state, &session, Some(current)).await,
        account,
        pets,
    }
    .into_response())
}

/// Display the profile edit form.
///
/// # Errors
///
/// Returns `AppError::Database` if the account cannot be loaded.
pub async fn edit_page(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
) -> Result<Response, AppError> {
    let Some(account) = load_account(&state, &session, &current).await? else {
        return Ok(Redirect::to("/login").into_response());
    };

    Ok(EditTemplate {
        page: PageContext::load(&state, &session, Some(current)).await,
        account,
    }
    .into_response())
}

/// Handle the profile edit form.
///
/// # Errors
///
/// Returns `AppError` on database, hashing or session failures.
pub async fn edit(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    Form(form): Form<EditForm>,
) -> Result<Redirect, AppError> {
    let auth = AuthService::new(state.pool());
    match auth
        .update_profile(current.id, &profile_edit_from_form(&form))
        .await
    {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "profile updated");
            flash_redirect(&session, Flash::success("Profile updated."), "/dashboard").await
        }
        Err(e) => match e.user_message() {
            Some(message) => flash_redirect(&session, Flash::error(message), "/edit").await,
            None => Err(e.into()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_fields_leave_values_unchanged() {
        let form = EditForm {
            name: Some("  ".into()),
            password: "new password".into(),
            confirm_password: "new password".into(),
            primary_phone: Some("5559876543".into()),
            secondary_phone: None,
            clear_primary_phone: None,
            clear_secondary_phone: None,
            primary_address: Some(String::new()),
            secondary_address: Some("PO Box 9".into()),
            allow_sms: None,
            allow_mms: Some("on".into()),
            allow_voice: Some("on".into()),
            pet_watch: Some("on".into()),
        };

        let edit = profile_edit_from_form(&form);

        assert_eq!(edit.name, None);
        assert_eq!(edit.primary_phone, Some(PhoneNumber::new("5559876543")));
        assert_eq!(edit.secondary_phone, None);
        assert_eq!(edit.primary_address, None);
        assert_eq!(edit.secondary_address.as_deref(), Some("PO Box 9"));
        assert!(!edit.preferences.allow_sms);
        assert!(edit.preferences.allow_mms);
        assert!(edit.preferences.allow_voice);
        assert!(edit.pet_watch);
        assert_eq!(edit.password, "new password");
    }

    #[test]
    fn test_clear_box_empties_phone() {
        let form = EditForm {
            name: None,
            password: "new password".into(),
            confirm_password: "new password".into(),
            primary_phone: Some("5559876543".into()),
            secondary_phone: None,
            clear_primary_phone: Some("on".into()),
            clear_secondary_phone: None,
            primary_address: None,
            secondary_address: None,
            allow_sms: Some("on".into()),
            allow_mms: None,
            allow_voice: None,
            pet_watch: None,
        };

        let edit = profile_edit_from_form(&form);

        let cleared = edit.primary_phone.unwrap();
        assert!(cleared.is_empty());
        assert_eq!(edit.secondary_phone, None);
    }
}

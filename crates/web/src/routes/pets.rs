//! Pet route handlers: registration, pictures, profiles and sighting reports.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use orange_collar_core::{PetId, PetStatus, UserId};

use crate::db::{PetRepository, UserRepository};
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::{Flash, OptionalAuth, RequireAuth};
use crate::models::{CurrentUser, NewPet, Pet, User};
use crate::routes::auth::NextQuery;
use crate::routes::{PageContext, checked, flash_redirect, safe_next};
use crate::services::sighting::{PET_NOT_FOUND_MESSAGE, SightingError, SightingOutcome};
use crate::services::uploads::UploadError;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Pet registration form data.
#[derive(Debug, Deserialize)]
pub struct NewPetForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub species: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub breed: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub description: String,
    pub indoor_pet: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub home_address: String,
    pub next: Option<String>,
}

/// Pet status change form data.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    #[serde(default)]
    pub status: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Pet registration template.
#[derive(Template, WebTemplate)]
#[template(path = "new_user_pet.html")]
pub struct NewPetTemplate {
    pub page: PageContext,
    pub next: String,
}

/// Picture upload template.
#[derive(Template, WebTemplate)]
#[template(path = "image_upload.html")]
pub struct ImageUploadTemplate {
    pub page: PageContext,
    pub pet: Pet,
    pub allowed: String,
}

/// Pet profile template.
#[derive(Template, WebTemplate)]
#[template(path = "pet.html")]
pub struct PetTemplate {
    pub page: PageContext,
    pub pet: Pet,
    pub owner: Option<User>,
    pub is_owner: bool,
}

// =============================================================================
// Form mapping
// =============================================================================

/// Why a pet form was rejected.
#[derive(Debug, PartialEq, Eq)]
enum PetFormError {
    MissingSpecies,
    MissingStatus,
}

impl PetFormError {
    const fn message(&self) -> &'static str {
        match self {
            Self::MissingSpecies => "Please enter the species of your pet.",
            Self::MissingStatus => "Please enter your pet's status.",
        }
    }
}

/// Map the registration form onto a new pet, field by field.
fn new_pet_from_form(form: &NewPetForm, owner: UserId) -> Result<NewPet, PetFormError> {
    let species = form.species.trim();
    if species.is_empty() {
        return Err(PetFormError::MissingSpecies);
    }
    let status = PetStatus::parse(&form.status).map_err(|_| PetFormError::MissingStatus)?;

    Ok(NewPet {
        user_id: owner,
        name: form.name.trim().to_owned(),
        species: species.to_owned(),
        color: form.color.trim().to_owned(),
        breed: form.breed.trim().to_owned(),
        gender: form.gender.trim().to_owned(),
        description: form.description.trim().to_owned(),
        indoor_pet: checked(form.indoor_pet.as_ref()),
        status,
        home_address: form.home_address.trim().to_owned(),
    })
}

fn status_from_form(form: &StatusForm) -> Result<PetStatus, PetFormError> {
    PetStatus::parse(&form.status).map_err(|_| PetFormError::MissingStatus)
}

// =============================================================================
// Registration
// =============================================================================

/// Display the pet registration form.
pub async fn new_pet_page(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    Query(query): Query<NextQuery>,
) -> NewPetTemplate {
    NewPetTemplate {
        page: PageContext::load(&state, &session, Some(current)).await,
        next: safe_next(query.next.as_deref(), "/dashboard"),
    }
}

/// Handle pet registration.
///
/// # Errors
///
/// Returns `AppError` on database or session failures.
pub async fn new_pet(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    Form(form): Form<NewPetForm>,
) -> Result<Redirect, AppError> {
    let new_pet = match new_pet_from_form(&form, current.id) {
        Ok(pet) => pet,
        Err(e) => {
            return flash_redirect(&session, Flash::error(e.message()), "/new_user_pet").await;
        }
    };

    let pet = PetRepository::new(state.pool()).create(&new_pet).await?;
    tracing::info!(pet_id = %pet.id, user_id = %current.id, "pet registered");

    let next = safe_next(form.next.as_deref(), "/dashboard");
    flash_redirect(
        &session,
        Flash::success("Successfully registered your pet. Good Work!"),
        &next,
    )
    .await
}

// =============================================================================
// Ownership
// =============================================================================

fn ensure_owner(pet: &Pet, current: &CurrentUser) -> Result<(), AppError> {
    if pet.user_id == current.id {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "pet {} belongs to another user",
            pet.id
        )))
    }
}

/// Load a pet the current user owns.
///
/// `Ok(None)` means no such pet.
async fn owned_pet(
    state: &AppState,
    pet_id: PetId,
    current: &CurrentUser,
) -> Result<Option<Pet>, AppError> {
    let Some(pet) = PetRepository::new(state.pool()).get(pet_id).await? else {
        return Ok(None);
    };
    ensure_owner(&pet, current)?;
    Ok(Some(pet))
}

/// Change a pet's status.
///
/// # Errors
///
/// Returns `AppError::Forbidden` if the pet belongs to someone else, or
/// `AppError` on database or session failures.
pub async fn update_status(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    Path(pet_id): Path<PetId>,
    Form(form): Form<StatusForm>,
) -> Result<Redirect, AppError> {
    if owned_pet(&state, pet_id, &current).await?.is_none() {
        return flash_redirect(&session, Flash::error(PET_NOT_FOUND_MESSAGE), "/dashboard").await;
    }

    let profile = format!("/pet_profile/{pet_id}");
    let status = match status_from_form(&form) {
        Ok(status) => status,
        Err(e) => return flash_redirect(&session, Flash::error(e.message()), &profile).await,
    };

    PetRepository::new(state.pool())
        .set_status(pet_id, current.id, &status)
        .await?;
    tracing::info!(pet_id = %pet_id, user_id = %current.id, %status, "pet status changed");

    flash_redirect(&session, Flash::success("Status updated."), &profile).await
}

// =============================================================================
// Pictures
// =============================================================================

/// Display the picture upload form.
///
/// # Errors
///
/// Returns `AppError::Forbidden` if the pet belongs to someone else.
pub async fn upload_page(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    Path(pet_id): Path<PetId>,
) -> Result<Response, AppError> {
    let Some(pet) = owned_pet(&state, pet_id, &current).await? else {
        return Ok(flash_redirect(
            &session,
            Flash::error("Unable to locate the requested pet to upload file."),
            "/dashboard",
        )
        .await?
        .into_response());
    };

    Ok(ImageUploadTemplate {
        page: PageContext::load(&state, &session, Some(current)).await,
        pet,
        allowed: crate::services::uploads::ALLOWED_EXTENSIONS.join(", "),
    }
    .into_response())
}

/// Pull the `file` part out of an upload form.
async fn read_file_part(multipart: &mut Multipart) -> Result<(String, Vec<u8>), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_owned();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        return Ok((file_name, bytes.to_vec()));
    }
    Err(UploadError::MissingFile.into())
}

/// Handle a picture upload.
///
/// # Errors
///
/// Returns `AppError` on database, disk or session failures, or if the pet
/// belongs to someone else.
pub async fn upload(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    Path(pet_id): Path<PetId>,
    mut multipart: Multipart,
) -> Result<Redirect, AppError> {
    let Some(pet) = owned_pet(&state, pet_id, &current).await? else {
        return flash_redirect(
            &session,
            Flash::error("Unable to locate the requested pet to upload file."),
            "/dashboard",
        )
        .await;
    };

    let retry = format!("/image-upload/{pet_id}");
    let saved = match read_file_part(&mut multipart).await {
        Ok((file_name, bytes)) => state.images().save(pet_id, &file_name, &bytes).await,
        Err(AppError::Upload(e)) => Err(e),
        Err(e) => return Err(e),
    };

    let stored = match saved {
        Ok(stored) => stored,
        Err(e) => match e.user_message() {
            Some(message) => return flash_redirect(&session, Flash::error(message), &retry).await,
            None => return Err(e.into()),
        },
    };

    let pets = PetRepository::new(state.pool());
    state
        .images()
        .replace(
            &stored,
            pet.picture.as_deref(),
            pets.set_picture(pet_id, current.id, &stored),
        )
        .await?;

    flash_redirect(
        &session,
        Flash::success(format!("Saved {stored}")),
        &format!("/pet_profile/{pet_id}"),
    )
    .await
}

// =============================================================================
// Profile and sighting reports
// =============================================================================

/// Render a pet's profile, optionally with an extra message for this render.
async fn render_profile(
    state: &AppState,
    session: &Session,
    user: Option<CurrentUser>,
    pet_id: PetId,
    message: Option<Flash>,
) -> Result<Response, AppError> {
    let Some(pet) = PetRepository::new(state.pool()).get(pet_id).await? else {
        return Ok(
            flash_redirect(session, Flash::error(PET_NOT_FOUND_MESSAGE), "/dashboard")
                .await?
                .into_response(),
        );
    };
    let owner = UserRepository::new(state.pool())
        .get_by_id(pet.user_id)
        .await?;
    let is_owner = user.as_ref().is_some_and(|u| u.id == pet.user_id);

    let mut page = PageContext::load(state, session, user).await;
    if let Some(message) = message {
        page = page.with_flash(message);
    }

    Ok(PetTemplate {
        page,
        pet,
        owner,
        is_owner,
    }
    .into_response())
}

/// Display a pet's profile.
///
/// # Errors
///
/// Returns `AppError::Database` if the pet or owner cannot be loaded.
pub async fn profile(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(pet_id): Path<PetId>,
) -> Result<Response, AppError> {
    render_profile(&state, &session, user, pet_id, None).await
}

/// Report a sighting and re-render the profile with the outcome.
///
/// # Errors
///
/// Returns `AppError::Sighting` when persistence fails during the report.
pub async fn report_sighting(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(pet_id): Path<PetId>,
) -> Result<Response, AppError> {
    let id = pet_id.to_string();
    add_breadcrumb("sighting", "Reported sighting", Some(&[("pet_id", id.as_str())][..]));

    let message = match state.sightings().report_sighting(pet_id).await {
        Ok(outcome @ SightingOutcome::Dispatched(_)) => Flash::success(outcome.message()),
        Ok(outcome @ SightingOutcome::NoContactInfo) => Flash::info(outcome.message()),
        Err(SightingError::PetNotFound(_)) => {
            return Ok(
                flash_redirect(&session, Flash::error(PET_NOT_FOUND_MESSAGE), "/dashboard")
                    .await?
                    .into_response(),
            );
        }
        Err(e @ SightingError::OwnerNotFound(_)) => {
            tracing::warn!(error = %e, "sighting for pet without owner");
            Flash::error(e.user_message().unwrap_or_default())
        }
        Err(e) => return Err(e.into()),
    };

    render_profile(&state, &session, user, pet_id, Some(message)).await
}

//! TwiML call document fetched by the telephony provider during a voice call.

use askama::Template;
use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};

use orange_collar_core::PetId;

use crate::db::{PetRepository, UserRepository};
use crate::error::AppError;
use crate::models::{Pet, User};
use crate::services::sighting::sighting_message;
use crate::state::AppState;

/// Call instructions read to the owner.
#[derive(Template)]
#[template(path = "calltemplate.xml")]
pub struct CallTemplate {
    pub owner_name: String,
    pub message: String,
}

impl CallTemplate {
    /// Build the call document for `pet` and its `owner`.
    #[must_use]
    pub fn new(pet: &Pet, owner: &User, app_name: &str) -> Self {
        Self {
            owner_name: owner.name.clone(),
            message: sighting_message(pet, app_name),
        }
    }
}

/// Render the TwiML document for a pet.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the pet or its owner is missing.
pub async fn call_template(
    State(state): State<AppState>,
    Path(pet_id): Path<PetId>,
) -> Result<Response, AppError> {
    let pet = PetRepository::new(state.pool())
        .get(pet_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("pet {pet_id}")))?;
    let owner = UserRepository::new(state.pool())
        .get_by_id(pet.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("owner of pet {pet_id}")))?;

    let body = CallTemplate::new(&pet, &owner, &state.config().app_name)
        .render()
        .map_err(|e| AppError::Internal(format!("call template: {e}")))?;

    Ok(([(header::CONTENT_TYPE, "text/xml")], body).into_response())
}

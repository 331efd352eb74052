//! Manual sighting report.
//!
//! Runs the same dispatch as the pet profile page, using the web app's
//! configuration. Handy for checking Twilio credentials end to end.
//!
//! # Usage
//!
//! ```bash
//! oc-cli report 42
//! ```

use orange_collar_core::PetId;
use orange_collar_web::config::WebConfig;
use orange_collar_web::db;
use orange_collar_web::services::sighting::SightingOutcome;
use orange_collar_web::state::AppState;

/// Report a sighting of `pet_id` and log what was sent.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the database is
/// unreachable, or the pet or its owner does not exist.
pub async fn run(pet_id: PetId) -> Result<(), Box<dyn std::error::Error>> {
    let config = WebConfig::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;
    let state = AppState::new(config, pool)?;

    let outcome = state.sightings().report_sighting(pet_id).await?;

    match &outcome {
        SightingOutcome::Dispatched(report) => {
            for attempt in &report.attempts {
                match &attempt.delivery {
                    Ok(delivery) => {
                        tracing::info!(channel = %attempt.channel, ?delivery, "sent");
                    }
                    Err(e) => tracing::warn!(channel = %attempt.channel, error = %e, "failed"),
                }
            }
            tracing::info!(
                stamped_at = %report.stamped_at,
                failures = report.failures(),
                "contact timestamps updated"
            );
        }
        SightingOutcome::NoContactInfo => {
            tracing::warn!(%pet_id, "owner has no phone number on file");
        }
    }

    tracing::info!("{}", outcome.message());
    Ok(())
}

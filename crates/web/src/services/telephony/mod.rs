//! Contact channel gateway.
//!
//! The [`ContactGateway`] trait is the boundary between the sighting
//! orchestrator and the telephony provider. [`TwilioGateway`] is the
//! production implementation.

mod error;
mod twilio;

pub use error::GatewayError;
pub use twilio::TwilioGateway;

use async_trait::async_trait;
use url::Url;

use orange_collar_core::PhoneNumber;

/// Result of a single gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The provider accepted the request.
    Sent {
        /// Provider resource id (message or call SID).
        sid: String,
    },
    /// No destination number, so nothing was sent.
    Skipped,
}

/// Sends notifications to an owner's phone.
#[async_trait]
pub trait ContactGateway: Send + Sync {
    /// Send a text message to `to`.
    ///
    /// Returns [`Delivery::Skipped`] without contacting the provider when
    /// `to` is empty.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the provider rejects the request or cannot
    /// be reached.
    async fn send_text(&self, to: &PhoneNumber, body: &str) -> Result<Delivery, GatewayError>;

    /// Place a voice call to `to`. The provider fetches call instructions
    /// from `callback_url`.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the provider rejects the request or cannot
    /// be reached.
    async fn place_voice_call(
        &self,
        to: &PhoneNumber,
        callback_url: &Url,
    ) -> Result<Delivery, GatewayError>;
}

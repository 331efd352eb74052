//! Gateway error types.

use thiserror::Error;

/// Errors from the telephony provider.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Network failure, timeout or an unreadable response.
    #[error("telephony request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("telephony provider returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Provider error message, or the raw body if it was not JSON.
        message: String,
    },

    /// The endpoint URL could not be built from the configured base.
    #[error("invalid telephony endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

impl GatewayError {
    /// Whether the provider refused our credentials.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api { status: 401 | 403, .. })
    }
}

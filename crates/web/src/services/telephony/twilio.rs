//! Twilio REST client.
//!
//! Texts go to `Messages.json`, calls to `Calls.json`, both as form posts
//! authenticated with HTTP Basic (`account_sid:auth_token`).

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use orange_collar_core::PhoneNumber;

use super::{ContactGateway, Delivery, GatewayError};
use crate::config::TelephonyConfig;

/// Twilio API version segment.
const API_VERSION: &str = "2010-04-01";

/// Twilio-backed [`ContactGateway`].
#[derive(Clone)]
pub struct TwilioGateway {
    client: Client,
    account_sid: String,
    auth_token: SecretString,
    from_number: String,
    api_base: Url,
}

impl std::fmt::Debug for TwilioGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioGateway")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[REDACTED]")
            .field("from_number", &self.from_number)
            .field("api_base", &self.api_base.as_str())
            .finish_non_exhaustive()
    }
}

/// The part of a Twilio resource we keep.
#[derive(Debug, Deserialize)]
struct ResourceResponse {
    sid: String,
}

/// Twilio error body.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

impl TwilioGateway {
    /// Build a gateway with the configured request timeout.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Http` if the HTTP client cannot be built.
    pub fn new(config: &TelephonyConfig) -> Result<Self, GatewayError> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from_number: config.from_number.clone(),
            api_base: config.api_base.clone(),
        })
    }

    fn endpoint(&self, resource: &str) -> Result<Url, GatewayError> {
        let path = format!(
            "{API_VERSION}/Accounts/{}/{resource}.json",
            self.account_sid
        );
        Ok(self.api_base.join(&path)?)
    }

    /// POST a form to `resource` and return the created resource's SID.
    async fn create(
        &self,
        resource: &str,
        form: &[(&str, &str)],
    ) -> Result<Delivery, GatewayError> {
        let response = self
            .client
            .post(self.endpoint(resource)?)
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let created: ResourceResponse = response.json().await?;
        Ok(Delivery::Sent { sid: created.sid })
    }
}

#[async_trait]
impl ContactGateway for TwilioGateway {
    #[instrument(skip(self, body), fields(channel = "sms"))]
    async fn send_text(&self, to: &PhoneNumber, body: &str) -> Result<Delivery, GatewayError> {
        if to.is_empty() {
            tracing::debug!("no destination number, skipping text");
            return Ok(Delivery::Skipped);
        }

        let to = to.to_e164();
        self.create(
            "Messages",
            &[("To", &to), ("From", &self.from_number), ("Body", body)],
        )
        .await
    }

    #[instrument(skip(self), fields(channel = "voice", callback_url = %callback_url))]
    async fn place_voice_call(
        &self,
        to: &PhoneNumber,
        callback_url: &Url,
    ) -> Result<Delivery, GatewayError> {
        if to.is_empty() {
            tracing::debug!("no destination number, skipping call");
            return Ok(Delivery::Skipped);
        }

        let to = to.to_e164();
        self.create(
            "Calls",
            &[
                ("To", &to),
                ("From", &self.from_number),
                ("Url", callback_url.as_str()),
            ],
        )
        .await
    }
}

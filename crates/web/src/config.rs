//! Web application configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `OC_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `OC_BASE_URL` - Public URL of the site; the telephony provider fetches
//!   call instructions from here, so it must be reachable from the internet
//! - `OC_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//! - `TWILIO_SID` - Twilio account SID
//! - `TWILIO_AUTH_TOKEN` - Twilio auth token
//! - `OC_PHONE` - Originating phone number for texts and calls
//!
//! ## Optional
//! - `OC_HOST` - Bind address (default: 127.0.0.1)
//! - `OC_PORT` - Listen port (default: 5000)
//! - `OC_APP_NAME` - Name used in notifications (default: Orange Collar)
//! - `OC_IMAGES_DIR` - Directory for uploaded pet pictures
//!   (default: crates/web/static/images)
//! - `OC_CONTACT_STAMP` - Which contact timestamps a dispatch updates:
//!   `all` (default) or `attempted`
//! - `TWILIO_API_BASE` - Twilio API base URL (default: <https://api.twilio.com>)
//! - `TWILIO_TIMEOUT_SECS` - Outbound request timeout (default: 10)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use orange_collar_core::StampPolicy;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_APP_NAME: &str = "Orange Collar";
const DEFAULT_TWILIO_API_BASE: &str = "https://api.twilio.com";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "password",
    "xxx",
    "todo",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Web application configuration.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL, always ending in `/`
    pub base_url: Url,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Name used in page titles and outgoing notifications
    pub app_name: String,
    /// Where uploaded pet pictures are written
    pub images_dir: PathBuf,
    /// Which contact timestamps a sighting dispatch updates
    pub stamp_policy: StampPolicy,
    /// Telephony provider settings
    pub telephony: TelephonyConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Twilio account settings.
///
/// Implements `Debug` manually to redact the auth token.
#[derive(Clone)]
pub struct TelephonyConfig {
    /// Account SID, also the Basic auth user name
    pub account_sid: String,
    /// Auth token
    pub auth_token: SecretString,
    /// Originating number for texts and calls
    pub from_number: String,
    /// API base URL
    pub api_base: Url,
    /// Per-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for TelephonyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelephonyConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[REDACTED]")
            .field("from_number", &self.from_number)
            .field("api_base", &self.api_base.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl WebConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the session secret fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("OC_DATABASE_URL")?;
        let host = parse_env("OC_HOST", "127.0.0.1")?;
        let port = parse_env("OC_PORT", "5000")?;
        let base_url = parse_base_url(&get_required_env("OC_BASE_URL")?, "OC_BASE_URL")?;
        let session_secret = get_validated_secret("OC_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "OC_SESSION_SECRET")?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            app_name: get_env_or_default("OC_APP_NAME", DEFAULT_APP_NAME),
            images_dir: PathBuf::from(get_env_or_default(
                "OC_IMAGES_DIR",
                "crates/web/static/images",
            )),
            stamp_policy: parse_env("OC_CONTACT_STAMP", "all")?,
            telephony: TelephonyConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the site is served over HTTPS (controls secure cookies).
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.scheme() == "https"
    }
}

impl TelephonyConfig {
    /// Load Twilio settings from the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if credentials are missing or a value is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_base = get_env_or_default("TWILIO_API_BASE", DEFAULT_TWILIO_API_BASE);
        let timeout_secs: u64 = parse_env("TWILIO_TIMEOUT_SECS", "10")?;

        Ok(Self {
            account_sid: get_required_env("TWILIO_SID")?,
            auth_token: get_required_secret("TWILIO_AUTH_TOKEN")?,
            from_number: get_required_env("OC_PHONE")?,
            api_base: parse_base_url(&api_base, "TWILIO_API_BASE")?,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) with `FromStr`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse an absolute http(s) URL and make sure its path ends in `/` so that
/// `Url::join` appends to it instead of replacing the last segment.
fn parse_base_url(raw: &str, var_name: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn telephony() -> TelephonyConfig {
        TelephonyConfig {
            account_sid: "AC0123456789abcdef".to_string(),
            auth_token: SecretString::from("tok_9f8e7d6c5b4a"),
            from_number: "+15550001111".to_string(),
            api_base: Url::parse(DEFAULT_TWILIO_API_BASE).unwrap(),
            timeout: Duration::from_secs(10),
        }
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("changeme-session-key", "OC_SESSION_SECRET");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "OC_SESSION_SECRET");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_session_secret_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_session_secret(&secret, "OC_SESSION_SECRET").is_err());
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let url = parse_base_url("https://orange-collar.example.org/app", "OC_BASE_URL").unwrap();
        assert_eq!(url.as_str(), "https://orange-collar.example.org/app/");
        assert_eq!(
            url.join("calltemplate.xml/4").unwrap().as_str(),
            "https://orange-collar.example.org/app/calltemplate.xml/4"
        );
    }

    #[test]
    fn test_base_url_rejects_other_schemes() {
        assert!(matches!(
            parse_base_url("ftp://files.example.org", "OC_BASE_URL"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(parse_base_url("not a url", "OC_BASE_URL").is_err());
    }

    #[test]
    fn test_socket_addr_and_scheme() {
        let config = WebConfig {
            database_url: SecretString::from("postgres://localhost/orange_collar"),
            host: "127.0.0.1".parse().unwrap(),
            port: 5000,
            base_url: Url::parse("http://localhost:5000/").unwrap(),
            session_secret: SecretString::from("x".repeat(32)),
            app_name: DEFAULT_APP_NAME.to_string(),
            images_dir: PathBuf::from("static/images"),
            stamp_policy: StampPolicy::All,
            telephony: telephony(),
            sentry_dsn: None,
            sentry_environment: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 5000);
        assert!(!config.is_secure());
    }

    #[test]
    fn test_telephony_debug_redacts_token() {
        let debug_output = format!("{:?}", telephony());
        assert!(debug_output.contains("AC0123456789abcdef"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("tok_9f8e7d6c5b4a"));
    }
}

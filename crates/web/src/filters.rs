//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Renders a boolean as "Yes" or "No".
///
/// Usage in templates: `{{ account.preferences.allow_sms|yes_no }}`
#[askama::filter_fn]
pub fn yes_no(value: impl Display, _env: &dyn askama::Values) -> askama::Result<&'static str> {
    Ok(if value.to_string() == "true" { "Yes" } else { "No" })
}

/// Renders blank text as "Unknown".
///
/// Usage in templates: `{{ pet.breed|or_unknown }}`
#[askama::filter_fn]
pub fn or_unknown(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let text = value.to_string();
    Ok(if text.trim().is_empty() {
        "Unknown".to_owned()
    } else {
        text
    })
}

//! Owner phone numbers.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Country calling code prepended to national numbers.
const DEFAULT_COUNTRY_CODE: &str = "1";

/// A phone number as the owner entered it.
///
/// The stored form is the trimmed input (typically a 10-digit national
/// number such as `5551234567`). An empty number is a valid value meaning
/// "no phone on file"; use [`PhoneNumber::is_empty`] rather than comparing
/// against `""`.
///
/// ```
/// use orange_collar_core::PhoneNumber;
///
/// let phone = PhoneNumber::new(" (555) 123-4567 ");
/// assert_eq!(phone.to_e164(), "+15551234567");
/// assert!(PhoneNumber::new("   ").is_empty());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Create a phone number from user input, trimming surrounding whitespace.
    #[must_use]
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_owned())
    }

    /// Returns `true` if no usable digits are on file.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.0.chars().any(|c| c.is_ascii_digit())
    }

    /// Returns the number as entered.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Format for the telephony provider.
    ///
    /// Numbers already written with a leading `+` keep their country code;
    /// everything else is treated as a national number and gets `+1`.
    /// Formatting characters are dropped.
    #[must_use]
    pub fn to_e164(&self) -> String {
        let digits: String = self.0.chars().filter(char::is_ascii_digit).collect();
        if self.0.starts_with('+') {
            format!("+{digits}")
        } else {
            format!("+{DEFAULT_COUNTRY_CODE}{digits}")
        }
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PhoneNumber {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for PhoneNumber {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for PhoneNumber {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for PhoneNumber {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for PhoneNumber {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_national_number_gets_country_code() {
        assert_eq!(PhoneNumber::new("5551234567").to_e164(), "+15551234567");
        assert_eq!(PhoneNumber::new("555.123.4567").to_e164(), "+15551234567");
    }

    #[test]
    fn test_international_number_passes_through() {
        assert_eq!(PhoneNumber::new("+44 20 7946 0958").to_e164(), "+442079460958");
    }

    #[test]
    fn test_emptiness_is_about_digits() {
        assert!(PhoneNumber::default().is_empty());
        assert!(PhoneNumber::new("").is_empty());
        assert!(PhoneNumber::new(" - ").is_empty());
        assert!(!PhoneNumber::new("5551234567").is_empty());
    }

    #[test]
    fn test_new_trims_input() {
        assert_eq!(PhoneNumber::new("  5551234567 ").as_str(), "5551234567");
    }
}

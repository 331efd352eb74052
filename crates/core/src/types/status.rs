//! Pet status.
//!
//! Status is free-form text chosen by the owner ("lost", "found", "home", or
//! anything else they type). The well-known values get constants, but any
//! non-blank string is accepted.

use core::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a status is blank.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("pet status cannot be empty")]
pub struct PetStatusError;

/// A pet's current status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PetStatus(String);

impl PetStatus {
    /// The pet is missing.
    pub const LOST: &'static str = "lost";
    /// The pet was found by someone other than the owner.
    pub const FOUND: &'static str = "found";
    /// The pet is safe at home.
    pub const HOME: &'static str = "home";

    /// Parse a status, trimming whitespace.
    ///
    /// # Errors
    ///
    /// Returns `PetStatusError` if the input is blank.
    pub fn parse(s: &str) -> Result<Self, PetStatusError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PetStatusError);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the status text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the owner has marked the pet as lost (case-insensitive).
    #[must_use]
    pub fn is_lost(&self) -> bool {
        self.0.eq_ignore_ascii_case(Self::LOST)
    }
}

impl Default for PetStatus {
    fn default() -> Self {
        Self(Self::HOME.to_owned())
    }
}

impl fmt::Display for PetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for PetStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for PetStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(&s)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for PetStatus {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

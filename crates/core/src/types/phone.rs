//! Indian mobile number type.
//!
//! Buyers sign in with their mobile number, so this is the primary identity
//! key for a user. Input from forms arrives in many shapes (`+91 98765 43210`,
//! `098765-43210`, `919876543210`); all of them normalize to the bare
//! ten-digit subscriber number.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    #[error("phone number cannot be empty")]
    Empty,
    #[error("phone number may only contain digits, spaces, dashes and a leading +")]
    InvalidCharacter,
    #[error("phone number must have 10 digits (got {0})")]
    WrongLength(usize),
    #[error("mobile numbers start with 6, 7, 8 or 9")]
    InvalidPrefix,
}

/// A normalized ten-digit Indian mobile number.
///
/// ```
/// use wholesale_core::Phone;
///
/// let phone = Phone::parse("+91 98765-43210").unwrap();
/// assert_eq!(phone.as_str(), "9876543210");
/// assert_eq!(phone.e164(), "+919876543210");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Phone(String);

impl Phone {
    /// Parse a phone number, stripping separators and country/trunk prefixes.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, contains characters other than
    /// digits and separators, or does not reduce to a valid mobile number.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PhoneError::Empty);
        }

        let body = s.strip_prefix('+').unwrap_or(s);
        let mut digits = String::with_capacity(body.len());
        for c in body.chars() {
            match c {
                '0'..='9' => digits.push(c),
                ' ' | '-' | '(' | ')' => {}
                _ => return Err(PhoneError::InvalidCharacter),
            }
        }

        let national = match digits.len() {
            12 => digits.strip_prefix("91").unwrap_or(digits.as_str()),
            11 => digits.strip_prefix('0').unwrap_or(digits.as_str()),
            _ => digits.as_str(),
        };

        if national.len() != 10 {
            return Err(PhoneError::WrongLength(national.len()));
        }
        if !national.starts_with(['6', '7', '8', '9']) {
            return Err(PhoneError::InvalidPrefix);
        }

        Ok(Self(national.to_owned()))
    }

    /// The ten-digit national number.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The number in E.164 form, as SMS gateways expect it.
    #[must_use]
    pub fn e164(&self) -> String {
        format!("+91{}", self.0)
    }

    /// Number with all but the last four digits hidden, for logs.
    #[must_use]
    pub fn masked(&self) -> String {
        let tail = self.0.get(6..).unwrap_or_default();
        format!("XXXXXX{tail}")
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Phone {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Phone {
    type Error = PhoneError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Phone> for String {
    fn from(phone: Phone) -> Self {
        phone.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Phone {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Phone {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Phone {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_common_formats() {
        for input in [
            "9876543210",
            "+91 98765 43210",
            "+919876543210",
            "919876543210",
            "09876543210",
            "98765-43210",
            "(98765) 43210",
        ] {
            assert_eq!(Phone::parse(input).unwrap().as_str(), "9876543210", "{input}");
        }
    }

    #[test]
    fn test_parse_rejects_landline_prefix() {
        assert_eq!(Phone::parse("1234567890"), Err(PhoneError::InvalidPrefix));
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert_eq!(Phone::parse("98765"), Err(PhoneError::WrongLength(5)));
        assert_eq!(Phone::parse(""), Err(PhoneError::Empty));
    }

    #[test]
    fn test_parse_rejects_letters() {
        assert_eq!(
            Phone::parse("98765abcde"),
            Err(PhoneError::InvalidCharacter)
        );
    }

    #[test]
    fn test_masked_keeps_last_four() {
        let phone = Phone::parse("9876543210").unwrap();
        assert_eq!(phone.masked(), "XXXXXX3210");
    }
}

//! Authentication service.
//!
//! Buyers sign in with their mobile number and a six-digit one-time code.
//! A successful sign-in yields a bearer token for API clients; browsers also
//! get the user stored in their cookie session.
//!
//! Codes and tokens are stored only as SHA-256 hashes.

mod error;
mod sms;

pub use error::AuthError;
pub use sms::OtpSender;

use chrono::{Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use wholesale_core::Phone;

use crate::db::{OtpRepository, TokenRepository, UserRepository};
use crate::models::User;

/// How long a code stays valid.
pub const OTP_TTL_MINUTES: i64 = 10;

/// Wrong guesses allowed per code.
pub const MAX_OTP_ATTEMPTS: i32 = 5;

/// Codes a single phone may request per hour.
const MAX_OTPS_PER_HOUR: i64 = 5;

/// Bearer token lifetime.
pub const TOKEN_TTL_DAYS: i64 = 30;

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    otps: OtpRepository<'a>,
    tokens: TokenRepository<'a>,
    sender: &'a OtpSender,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, sender: &'a OtpSender) -> Self {
        Self {
            users: UserRepository::new(pool),
            otps: OtpRepository::new(pool),
            tokens: TokenRepository::new(pool),
            sender,
        }
    }

    /// Issue and deliver a new code for `phone`.
    ///
    /// Earlier unused codes for the same phone stop working.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidPhone` for an unparseable number,
    /// `AuthError::TooManyRequests` past the hourly limit, or
    /// `AuthError::Delivery` if the SMS could not be sent.
    #[instrument(skip(self, phone))]
    pub async fn request_otp(&self, phone: &str) -> Result<Phone, AuthError> {
        let phone = Phone::parse(phone)?;

        let recent = self
            .otps
            .count_since(&phone, Utc::now() - Duration::hours(1))
            .await?;
        if recent >= MAX_OTPS_PER_HOUR {
            warn!(phone = %phone.masked(), "OTP request limit reached");
            return Err(AuthError::TooManyRequests);
        }

        let code = generate_code();
        let expires_at = Utc::now() + Duration::minutes(OTP_TTL_MINUTES);
        self.otps.create(&phone, &hash_secret(&code), expires_at).await?;
        self.sender.send(&phone, &code).await?;

        info!(phone = %phone.masked(), "OTP issued");
        Ok(phone)
    }

    /// Check a code and sign the user in, creating the account on first use.
    ///
    /// Returns the user and a fresh raw bearer token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidOtp` if there is no live code or it does not
    /// match (the attempt is counted), `AuthError::TooManyAttempts` once the
    /// code is locked.
    #[instrument(skip(self, phone, code, name))]
    pub async fn verify_otp(
        &self,
        phone: &str,
        code: &str,
        name: Option<&str>,
    ) -> Result<(User, String), AuthError> {
        let phone = Phone::parse(phone)?;
        let record = self
            .otps
            .latest_active(&phone)
            .await?
            .ok_or(AuthError::InvalidOtp)?;

        let attempts = self
            .otps
            .claim_attempt(record.id, MAX_OTP_ATTEMPTS)
            .await?
            .ok_or(AuthError::TooManyAttempts)?;

        if !constant_time_compare(&record.code_hash, &hash_secret(code.trim())) {
            warn!(phone = %phone.masked(), attempts, "OTP mismatch");
            return Err(AuthError::InvalidOtp);
        }

        if !self.otps.consume(record.id).await? {
            return Err(AuthError::InvalidOtp);
        }

        let user = self.users.find_or_create(&phone, name).await?;
        let token = self.issue_token(&user).await?;

        info!(user_id = %user.id, "User signed in");
        Ok((user, token))
    }

    /// Create a bearer token for `user`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the token cannot be stored.
    pub async fn issue_token(&self, user: &User) -> Result<String, AuthError> {
        let token = generate_token();
        let expires_at = Utc::now() + Duration::days(TOKEN_TTL_DAYS);
        self.tokens
            .create(user.id, &hash_secret(&token), expires_at)
            .await?;
        Ok(token)
    }

    /// Resolve a raw bearer token to its user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the lookup fails.
    pub async fn user_for_token(&self, token: &str) -> Result<Option<User>, AuthError> {
        Ok(self.tokens.find_user(&hash_secret(token)).await?)
    }

    /// Revoke a raw bearer token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the delete fails.
    pub async fn revoke_token(&self, token: &str) -> Result<(), AuthError> {
        self.tokens.revoke(&hash_secret(token)).await?;
        Ok(())
    }
}

/// Six random digits, zero-padded.
fn generate_code() -> String {
    format!("{:06}", rand::rng().random_range(0..1_000_000))
}

/// 32 random bytes as hex.
fn generate_token() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}

/// SHA-256 of a secret as lowercase hex.
pub(crate) fn hash_secret(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_code_is_six_digits() {
        for _ in 0..100 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_token_is_64_hex_chars_and_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_secret_known_vector() {
        assert_eq!(
            hash_secret("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_otp_hash_comparison() {
        let stored = hash_secret("042917");
        assert!(constant_time_compare(&stored, &hash_secret("042917")));
        assert!(!constant_time_compare(&stored, &hash_secret("042918")));
        assert!(!constant_time_compare(&stored, "short"));
    }
}

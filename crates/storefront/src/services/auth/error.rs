//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during OTP sign-in.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Phone number could not be parsed.
    #[error("invalid phone number: {0}")]
    InvalidPhone(#[from] wholesale_core::PhoneError),

    /// Code does not match, or no live code exists for the phone.
    #[error("invalid or expired OTP")]
    InvalidOtp,

    /// The live code has used up its attempts.
    #[error("too many incorrect attempts, request a new OTP")]
    TooManyAttempts,

    /// Too many codes requested for one phone.
    #[error("too many OTP requests, try again later")]
    TooManyRequests,

    /// The code could not be delivered.
    #[error("could not send OTP: {0}")]
    Delivery(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

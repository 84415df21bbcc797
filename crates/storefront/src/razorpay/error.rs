//! Razorpay-related errors.

use thiserror::Error;

/// Errors that can occur when talking to Razorpay.
#[derive(Debug, Error)]
pub enum RazorpayError {
    /// HTTP request failed.
    #[error("Razorpay request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Razorpay returned an error response.
    #[error("Razorpay API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Signature did not match.
    #[error("Invalid Razorpay signature")]
    InvalidSignature,

    /// Amount could not be expressed in paise.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

//! Delhivery-related errors.

use thiserror::Error;

/// Errors that can occur when talking to Delhivery.
#[derive(Debug, Error)]
pub enum DelhiveryError {
    /// HTTP request failed.
    #[error("Delhivery request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Delhivery returned a non-success status.
    #[error("Delhivery API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Delhivery accepted the request but rejected the package.
    #[error("Delhivery rejected the shipment: {0}")]
    Rejected(String),

    /// Response body did not have the expected shape.
    #[error("Unexpected Delhivery response: {0}")]
    Parse(String),

    /// Waybill not known to Delhivery.
    #[error("Waybill not found: {0}")]
    WaybillNotFound(String),
}

//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding. All route handlers return `Result<T, AppError>`; the
//! response body is always `{"success": false, "error": "<message>"}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::delhivery::DelhiveryError;
use crate::services::auth::AuthError;
use crate::services::orders::OrderError;
use crate::services::payments::PaymentError;
use crate::services::shipping::ShippingError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Sign-in failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Checkout or cancellation failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Payment flow failed.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Shipment operation failed.
    #[error("Shipping error: {0}")]
    Shipping(#[from] ShippingError),

    /// Direct Delhivery call failed.
    #[error("Delhivery error: {0}")]
    Delhivery(#[from] DelhiveryError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User lacks the required role.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

const INTERNAL: &str = "Internal server error";

fn repository_status(err: &RepositoryError) -> (StatusCode, String) {
    match err {
        RepositoryError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
        RepositoryError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string())
        }
    }
}

fn delhivery_status(err: &DelhiveryError) -> (StatusCode, String) {
    match err {
        DelhiveryError::Rejected(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        DelhiveryError::WaybillNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        DelhiveryError::Http(_) | DelhiveryError::Api { .. } | DelhiveryError::Parse(_) => (
            StatusCode::BAD_GATEWAY,
            "Courier service unavailable".to_string(),
        ),
    }
}

impl AppError {
    /// Status code and client-safe message.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Database(err) => repository_status(err),
            Self::Delhivery(err) => delhivery_status(err),
            Self::Auth(err) => match err {
                AuthError::InvalidPhone(_) => (StatusCode::BAD_REQUEST, err.to_string()),
                AuthError::InvalidOtp | AuthError::TooManyAttempts => {
                    (StatusCode::UNAUTHORIZED, err.to_string())
                }
                AuthError::TooManyRequests => (StatusCode::TOO_MANY_REQUESTS, err.to_string()),
                AuthError::Delivery(_) => (
                    StatusCode::BAD_GATEWAY,
                    "Could not send OTP, please try again".to_string(),
                ),
                AuthError::Repository(e) => repository_status(e),
            },
            Self::Order(err) => match err {
                OrderError::AddressNotFound | OrderError::NotFound => {
                    (StatusCode::NOT_FOUND, err.to_string())
                }
                OrderError::Delhivery(e) => delhivery_status(e),
                OrderError::Repository(e) => repository_status(e),
                OrderError::EmptyCart
                | OrderError::CartProblem(_)
                | OrderError::Coupon(_)
                | OrderError::NotServiceable(_)
                | OrderError::CodUnavailable(_)
                | OrderError::NotCancellable(_) => (StatusCode::BAD_REQUEST, err.to_string()),
            },
            Self::Payment(err) => match err {
                PaymentError::OrderNotFound => (StatusCode::NOT_FOUND, err.to_string()),
                PaymentError::NotPayable(_) | PaymentError::InvalidSignature => {
                    (StatusCode::BAD_REQUEST, err.to_string())
                }
                PaymentError::Razorpay(_) => (
                    StatusCode::BAD_GATEWAY,
                    "Payment gateway unavailable".to_string(),
                ),
                PaymentError::Repository(e) => repository_status(e),
            },
            Self::Shipping(err) => match err {
                ShippingError::OrderNotFound | ShippingError::ShipmentNotFound => {
                    (StatusCode::NOT_FOUND, err.to_string())
                }
                ShippingError::AlreadyShipped(_) => (StatusCode::CONFLICT, err.to_string()),
                ShippingError::NotShippable(_)
                | ShippingError::NoPickupLocation
                | ShippingError::UnknownWarehouse(_) => (StatusCode::BAD_REQUEST, err.to_string()),
                ShippingError::Delhivery(e) => delhivery_status(e),
                ShippingError::Repository(e) => repository_status(e),
            },
            Self::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found")),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests, please slow down".to_string(),
            ),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        // Capture server and upstream errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        (
            status,
            Json(serde_json::json!({ "success": false, "error": message })),
        )
            .into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a buyer action.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    fn status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("Product".to_string());
        assert_eq!(err.to_string(), "Not found: Product");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(status(AppError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(AppError::Unauthorized("x".into())), StatusCode::UNAUTHORIZED);
        assert_eq!(status(AppError::Forbidden("x".into())), StatusCode::FORBIDDEN);
        assert_eq!(status(AppError::BadRequest("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(AppError::RateLimited), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            status(AppError::Internal("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_conflict_maps_to_409() {
        let err = AppError::from(RepositoryError::Conflict("insufficient stock".into()));
        assert_eq!(status(err), StatusCode::CONFLICT);
    }

    #[test]
    fn test_otp_errors() {
        assert_eq!(
            status(AuthError::InvalidOtp.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status(AuthError::TooManyRequests.into()),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_upstream_errors_are_bad_gateway() {
        let err = AppError::Delhivery(DelhiveryError::Api {
            status: 503,
            message: "down".into(),
        });
        assert_eq!(status(err), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status(AppError::Delhivery(DelhiveryError::Rejected("NSZ".into()))),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_body_is_json_and_hides_internals() {
        let response = AppError::Internal("db password wrong".into()).into_response();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_order_error_message_passed_through() {
        let response = AppError::from(OrderError::EmptyCart).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Your cart is empty");
    }
}

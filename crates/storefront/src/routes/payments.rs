//! Razorpay checkout and webhook.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use serde::Deserialize;
use tracing::instrument;

use wholesale_core::OrderId;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::Order;
use crate::services::payments::{GatewayOrder, PaymentService, VerifyRequest};
use crate::state::AppState;

/// Header Razorpay signs webhook bodies into.
pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePayment {
    pub order_id: OrderId,
}

/// POST /api/payments/order
///
/// # Errors
///
/// Returns 400 if the order cannot be paid online, 404 for someone else's
/// order, 502 if Razorpay is unreachable.
#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn create_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<CreatePayment>,
) -> Result<Json<GatewayOrder>> {
    let gateway = PaymentService::new(&state)
        .create_gateway_order(&user, body.order_id)
        .await?;
    Ok(Json(gateway))
}

/// POST /api/payments/verify
///
/// Called by the browser after the checkout widget reports success.
///
/// # Errors
///
/// Returns 400 for a bad signature.
#[instrument(skip(state, body), fields(user_id = %user.id))]
pub async fn verify(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<VerifyRequest>,
) -> Result<Json<Order>> {
    let order = PaymentService::new(&state).verify(&user, &body).await?;
    add_breadcrumb(
        "payment",
        "Payment verified",
        Some(&[("order_number", &order.order_number)]),
    );
    Ok(Json(order))
}

/// POST /api/payments/webhook
///
/// The signature covers the raw body, so it is taken as bytes. Once the
/// signature checks out the answer is always 200, so Razorpay stops
/// retrying events we chose to ignore.
///
/// # Errors
///
/// Returns 400 for a missing or invalid signature.
#[instrument(skip_all, fields(len = body.len()))]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing webhook signature".to_string()))?;

    PaymentService::new(&state)
        .handle_webhook(&body, signature)
        .await?;

    Ok(Json(serde_json::json!({ "status": "ok" })))
}

//! Coupon validation and admin management.

use axum::{Json, extract::State};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::db::CouponRepository;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::coupon::CouponRejection;
use crate::models::{Coupon, CouponInput};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ValidateCoupon {
    pub code: String,
    pub subtotal: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponQuote {
    pub valid: bool,
    pub code: String,
    pub discount: Decimal,
    pub description: Option<String>,
}

/// POST /api/coupons/validate
///
/// Quotes the discount without reserving the coupon; checkout checks it
/// again.
///
/// # Errors
///
/// Returns 400 with the reason the coupon does not apply.
#[instrument(skip(state, body), fields(user_id = %user.id))]
pub async fn validate(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<ValidateCoupon>,
) -> Result<Json<CouponQuote>> {
    let code = body.code.trim().to_uppercase();
    let coupon = CouponRepository::new(state.pool())
        .get_by_code(&code)
        .await?
        .ok_or_else(|| AppError::BadRequest(CouponRejection::Unknown.to_string()))?;

    let discount = coupon
        .discount_for(body.subtotal, Utc::now())
        .map_err(|reason| AppError::BadRequest(reason.to_string()))?;

    Ok(Json(CouponQuote {
        valid: true,
        code: coupon.code,
        discount,
        description: coupon.description,
    }))
}

/// GET /api/coupons (admin)
///
/// # Errors
///
/// Returns 500 if the database query fails.
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<Coupon>>> {
    Ok(Json(CouponRepository::new(state.pool()).list().await?))
}

/// POST /api/coupons (admin)
///
/// # Errors
///
/// Returns 400 for invalid input, 409 if the code exists.
#[instrument(skip(state, input), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<CouponInput>,
) -> Result<Json<Coupon>> {
    input.validate().map_err(AppError::BadRequest)?;
    let coupon = CouponRepository::new(state.pool()).create(&input).await?;
    tracing::info!(code = %coupon.code, "Coupon created");
    Ok(Json(coupon))
}

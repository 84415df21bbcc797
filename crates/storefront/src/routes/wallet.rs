//! Store credit.

use axum::{
    Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use wholesale_core::UserId;

use crate::db::WalletRepository;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::WalletTransaction;
use crate::state::AppState;

/// How many transactions the wallet view shows.
const RECENT_TRANSACTIONS: i64 = 50;

#[derive(Debug, Serialize)]
pub struct Wallet {
    pub balance: Decimal,
    pub transactions: Vec<WalletTransaction>,
}

#[derive(Debug, Deserialize)]
pub struct CreditRequest {
    pub amount: Decimal,
    pub reason: String,
}

/// GET /api/wallet
///
/// # Errors
///
/// Returns 500 if the database query fails.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Wallet>> {
    let (balance, transactions) = WalletRepository::new(state.pool())
        .summary(user.id, RECENT_TRANSACTIONS)
        .await?;
    Ok(Json(Wallet {
        balance,
        transactions,
    }))
}

/// POST /api/admin/wallet/{userId}/credit (admin)
///
/// # Errors
///
/// Returns 400 for a non-positive amount or blank reason, 404 for an unknown
/// user.
#[instrument(skip(state, body), fields(admin_id = %admin.id))]
pub async fn credit(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(user_id): Path<UserId>,
    Json(body): Json<CreditRequest>,
) -> Result<Json<WalletTransaction>> {
    if body.amount <= Decimal::ZERO {
        return Err(AppError::BadRequest("Amount must be positive".to_string()));
    }
    let reason = body.reason.trim();
    if reason.is_empty() {
        return Err(AppError::BadRequest("A reason is required".to_string()));
    }

    let entry = WalletRepository::new(state.pool())
        .credit(user_id, body.amount.round_dp(2), reason)
        .await?;
    tracing::info!(%user_id, amount = %entry.amount, "Wallet credited by admin");
    Ok(Json(entry))
}

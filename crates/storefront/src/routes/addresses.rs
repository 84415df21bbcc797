//! Saved delivery addresses.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use wholesale_core::AddressId;

use crate::db::AddressRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Address, AddressInput};
use crate::state::AppState;

/// GET /api/addresses
///
/// # Errors
///
/// Returns 500 if the database query fails.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Address>>> {
    let addresses = AddressRepository::new(state.pool()).list(user.id).await?;
    Ok(Json(addresses))
}

/// POST /api/addresses
///
/// The first address a user saves becomes their default.
///
/// # Errors
///
/// Returns 400 for a blank required field. Malformed phone numbers and
/// pincodes are rejected while parsing the body.
#[instrument(skip(state, input), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(input): Json<AddressInput>,
) -> Result<Json<Address>> {
    input.validate().map_err(AppError::BadRequest)?;
    let address = AddressRepository::new(state.pool())
        .create(user.id, &input)
        .await?;
    Ok(Json(address))
}

/// PUT /api/addresses/{id}
///
/// # Errors
///
/// Returns 400 for a blank required field, 404 for someone else's address.
#[instrument(skip(state, input), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
    Json(input): Json<AddressInput>,
) -> Result<Json<Address>> {
    input.validate().map_err(AppError::BadRequest)?;
    let address = AddressRepository::new(state.pool())
        .update(user.id, id, &input)
        .await?;
    Ok(Json(address))
}

/// PUT /api/addresses/{id}/default
///
/// # Errors
///
/// Returns 404 for someone else's address.
#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn set_default(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
) -> Result<Json<Address>> {
    let address = AddressRepository::new(state.pool())
        .set_default(user.id, id)
        .await?;
    Ok(Json(address))
}

/// DELETE /api/addresses/{id}
///
/// # Errors
///
/// Returns 400 for the default address, 404 for someone else's address.
#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<AddressId>,
) -> Result<Json<serde_json::Value>> {
    let repo = AddressRepository::new(state.pool());
    let address = repo
        .get(user.id, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Address".to_string()))?;
    if address.is_default {
        return Err(AppError::BadRequest(
            "Cannot delete the default address. Set another address as default first.".to_string(),
        ));
    }

    repo.delete(user.id, id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

//! Courier endpoints.
//!
//! Pincode, TAT and tracking lookups are public so product pages can show
//! delivery estimates. Everything that books, cancels or configures
//! shipments is admin-only.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use wholesale_core::{OrderId, Pincode, WarehouseId};

use crate::db::WarehouseRepository;
use crate::delhivery::{
    ChargesQuery, PickupRequest, PincodeServiceability, TatQuote, TrackingInfo, TransportMode,
    WarehouseRegistration,
};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{Shipment, Warehouse, WarehouseInput};
use crate::services::shipping::ShippingService;
use crate::state::AppState;

/// Most waybills fetched in one call.
const MAX_WAYBILL_BATCH: u32 = 100;

fn shipping(state: &AppState) -> ShippingService<'_> {
    let config = state.config();
    ShippingService::new(
        state.pool(),
        state.delhivery(),
        &config.delhivery,
        &config.seller,
    )
}

fn parse_pincode(value: &str) -> Result<Pincode> {
    Pincode::parse(value).map_err(|e| AppError::BadRequest(e.to_string()))
}

// =============================================================================
// Public
// =============================================================================

/// GET /api/delhivery/pincode/{pin}
///
/// # Errors
///
/// Returns 400 for a malformed pincode, 502 if Delhivery is down.
#[instrument(skip(state))]
pub async fn pincode(
    State(state): State<AppState>,
    Path(pin): Path<String>,
) -> Result<Json<PincodeServiceability>> {
    let pin = parse_pincode(&pin)?;
    Ok(Json(state.delhivery().check_pincode(pin.as_str()).await?))
}

#[derive(Debug, Deserialize)]
pub struct TatQuery {
    /// Defaults to the configured origin pincode.
    pub origin: Option<String>,
    pub destination: String,
    #[serde(default)]
    pub mode: TransportMode,
}

/// GET /api/delhivery/tat?origin=&destination=&mode=
///
/// # Errors
///
/// Returns 400 for malformed pincodes or when no origin is known.
#[instrument(skip(state))]
pub async fn tat(
    State(state): State<AppState>,
    Query(query): Query<TatQuery>,
) -> Result<Json<TatQuote>> {
    let origin = query
        .origin
        .or_else(|| state.config().delhivery.origin_pincode.clone())
        .ok_or_else(|| AppError::BadRequest("origin pincode is required".to_string()))?;
    let origin = parse_pincode(&origin)?;
    let destination = parse_pincode(&query.destination)?;

    let quote = state
        .delhivery()
        .expected_tat(origin.as_str(), destination.as_str(), query.mode)
        .await?;
    Ok(Json(quote))
}

/// GET /api/delhivery/track/{waybill}
///
/// # Errors
///
/// Returns 404 for an unknown waybill.
#[instrument(skip(state))]
pub async fn track(
    State(state): State<AppState>,
    Path(waybill): Path<String>,
) -> Result<Json<TrackingInfo>> {
    Ok(Json(shipping(&state).track(waybill.trim()).await?))
}

// =============================================================================
// Shipments (admin)
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShipment {
    pub order_id: OrderId,
    /// Pickup location name; defaults to the configured one.
    pub warehouse: Option<String>,
}

/// POST /api/delhivery/shipments
///
/// # Errors
///
/// Returns 400 if the order cannot ship yet or Delhivery rejects the
/// package, 409 if it already has a live shipment.
#[instrument(skip(state), fields(admin_id = %admin.id))]
pub async fn create_shipment(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<CreateShipment>,
) -> Result<Json<Shipment>> {
    let shipment = shipping(&state)
        .create_for_order(body.order_id, body.warehouse.as_deref())
        .await?;
    Ok(Json(shipment))
}

/// POST /api/delhivery/shipments/{waybill}/cancel
///
/// # Errors
///
/// Returns 404 for a waybill we did not create.
#[instrument(skip(state), fields(admin_id = %admin.id))]
pub async fn cancel_shipment(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(waybill): Path<String>,
) -> Result<Json<Shipment>> {
    Ok(Json(shipping(&state).cancel(waybill.trim()).await?))
}

/// GET /api/delhivery/pickup-locations
///
/// # Errors
///
/// Returns 500 if the database query fails.
pub async fn pickup_locations(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<Warehouse>>> {
    Ok(Json(WarehouseRepository::new(state.pool()).list_active().await?))
}

/// POST /api/delhivery/pickup
///
/// # Errors
///
/// Returns 400 for an unknown pickup location or zero packages.
#[instrument(skip(state, body), fields(admin_id = %admin.id))]
pub async fn request_pickup(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<PickupRequest>,
) -> Result<Json<serde_json::Value>> {
    if body.expected_package_count == 0 {
        return Err(AppError::BadRequest(
            "expectedPackageCount must be at least 1".to_string(),
        ));
    }
    WarehouseRepository::new(state.pool())
        .get_active_by_name(&body.pickup_location)
        .await?
        .ok_or_else(|| {
            AppError::BadRequest(format!("Unknown pickup location: {}", body.pickup_location))
        })?;

    let response = state.delhivery().create_pickup_request(&body).await?;
    tracing::info!(
        location = %body.pickup_location,
        date = %body.pickup_date,
        packages = body.expected_package_count,
        "Pickup requested"
    );
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct WaybillQuery {
    pub count: Option<u32>,
}

/// GET /api/delhivery/waybills?count=
///
/// # Errors
///
/// Returns 502 if Delhivery is down.
pub async fn waybills(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<WaybillQuery>,
) -> Result<Json<Vec<String>>> {
    let count = query.count.unwrap_or(1).clamp(1, MAX_WAYBILL_BATCH);
    Ok(Json(state.delhivery().fetch_waybills(count).await?))
}

/// GET /api/delhivery/charges?origin=&destination=&weightGrams=&mode=&paymentMode=
///
/// # Errors
///
/// Returns 400 for malformed pincodes.
pub async fn charges(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<ChargesQuery>,
) -> Result<Json<serde_json::Value>> {
    parse_pincode(&query.origin)?;
    parse_pincode(&query.destination)?;
    if query.weight_grams <= 0 {
        return Err(AppError::BadRequest("weightGrams must be positive".to_string()));
    }
    Ok(Json(state.delhivery().shipping_charges(&query).await?))
}

/// GET /api/delhivery/labels/{waybill}
///
/// # Errors
///
/// Returns 502 if Delhivery is down.
pub async fn label(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(waybill): Path<String>,
) -> Result<Json<serde_json::Value>> {
    Ok(Json(state.delhivery().packing_slip(waybill.trim()).await?))
}

#[derive(Debug, Deserialize)]
pub struct DocumentQuery {
    #[serde(rename = "type")]
    pub doc_type: String,
}

/// GET /api/delhivery/documents/{waybill}?type=
///
/// `type` is one of Delhivery's document kinds, e.g. `SIGNATURE_URL` or
/// `EPOD`.
///
/// # Errors
///
/// Returns 502 if Delhivery is down.
pub async fn document(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(waybill): Path<String>,
    Query(query): Query<DocumentQuery>,
) -> Result<Json<serde_json::Value>> {
    let doc_type = query.doc_type.trim().to_ascii_uppercase();
    if doc_type.is_empty() {
        return Err(AppError::BadRequest("type is required".to_string()));
    }
    Ok(Json(
        state.delhivery().document(&doc_type, waybill.trim()).await?,
    ))
}

// =============================================================================
// Warehouses (admin)
// =============================================================================

/// GET /api/delhivery/warehouses
///
/// # Errors
///
/// Returns 500 if the database query fails.
pub async fn warehouses(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<Warehouse>>> {
    Ok(Json(WarehouseRepository::new(state.pool()).list_active().await?))
}

/// POST /api/delhivery/warehouses
///
/// Registers the pickup location with Delhivery, then stores it.
///
/// # Errors
///
/// Returns 400 for blank fields or when Delhivery refuses the warehouse.
#[instrument(skip(state, input), fields(admin_id = %admin.id))]
pub async fn create_warehouse(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<WarehouseInput>,
) -> Result<Json<Warehouse>> {
    input.validate().map_err(AppError::BadRequest)?;
    state
        .delhivery()
        .create_warehouse(&WarehouseRegistration::from(&input))
        .await?;

    let warehouse = WarehouseRepository::new(state.pool()).upsert(&input).await?;
    tracing::info!(name = %warehouse.name, "Warehouse registered");
    Ok(Json(warehouse))
}

/// PUT /api/delhivery/warehouses/{id}
///
/// Delhivery keys warehouses by name, so the name cannot change.
///
/// # Errors
///
/// Returns 400 for blank fields or a rename, 404 for an unknown warehouse.
#[instrument(skip(state, input), fields(admin_id = %admin.id))]
pub async fn update_warehouse(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<WarehouseId>,
    Json(input): Json<WarehouseInput>,
) -> Result<Json<Warehouse>> {
    input.validate().map_err(AppError::BadRequest)?;
    let repo = WarehouseRepository::new(state.pool());
    let existing = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Warehouse".to_string()))?;
    if existing.name != input.name.trim() {
        return Err(AppError::BadRequest(
            "Warehouse names cannot be changed".to_string(),
        ));
    }

    state
        .delhivery()
        .update_warehouse(&WarehouseRegistration::from(&input))
        .await?;
    Ok(Json(repo.update(id, &input).await?))
}

/// DELETE /api/delhivery/warehouses/{id}
///
/// Delhivery has no delete, so the warehouse is only deactivated here.
///
/// # Errors
///
/// Returns 404 for an unknown warehouse.
#[instrument(skip(state), fields(admin_id = %admin.id))]
pub async fn delete_warehouse(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<WarehouseId>,
) -> Result<Json<serde_json::Value>> {
    WarehouseRepository::new(state.pool()).deactivate(id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

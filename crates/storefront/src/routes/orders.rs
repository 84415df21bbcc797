//! Checkout and order history, plus the admin order desk.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use wholesale_core::{OrderId, OrderStatus};

use crate::db::{OrderRepository, PaymentRepository};
use crate::delhivery::TrackingInfo;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::{Order, Payment};
use crate::routes::{Page, PageQuery};
use crate::services::orders::{CheckoutRequest, OrderService};
use crate::services::payments::on_order_confirmed;
use crate::services::shipping::ShippingService;
use crate::state::AppState;

fn order_service(state: &AppState) -> OrderService<'_> {
    OrderService::new(state.pool(), state.delhivery())
}

/// POST /api/orders
///
/// Turns the cart into an order. Cash-on-delivery and wallet-paid orders
/// are confirmed immediately and get their confirmation email and shipment
/// here; prepaid orders wait for the payment flow.
///
/// # Errors
///
/// Returns 400 for an empty or unorderable cart, a rejected coupon or an
/// undeliverable pincode, 404 for an unknown address, 409 when stock ran out
/// while placing.
#[instrument(skip(state, request), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<Order>> {
    let order = order_service(&state).place_order(user.id, &request).await?;
    add_breadcrumb(
        "checkout",
        "Order placed",
        Some(&[("order_number", &order.order_number)]),
    );

    if order.status == OrderStatus::Confirmed {
        on_order_confirmed(&state, &order).await;
    }

    Ok(Json(order))
}

/// GET /api/orders
///
/// # Errors
///
/// Returns 500 if the database query fails.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<Order>>> {
    let (page, limit) = query.normalized();
    let (orders, total) = OrderRepository::new(state.pool())
        .list_for_user(user.id, limit, (page - 1) * limit)
        .await?;
    Ok(Json(Page::new(orders, total, page, limit)))
}

/// GET /api/orders/{id}
///
/// # Errors
///
/// Returns 404 unless the order is the caller's (or the caller is an admin).
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    Ok(Json(order_service(&state).get_for(&user, id).await?))
}

/// POST /api/orders/{id}/cancel
///
/// # Errors
///
/// Returns 400 once the order has shipped.
#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    Ok(Json(order_service(&state).cancel(&user, id).await?))
}

/// GET /api/orders/{id}/track
///
/// # Errors
///
/// Returns 400 if the order has no shipment yet, 502 if Delhivery is down.
#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn track(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<TrackingInfo>> {
    let order = order_service(&state).get_for(&user, id).await?;
    let config = state.config();
    let tracking = ShippingService::new(
        state.pool(),
        state.delhivery(),
        &config.delhivery,
        &config.seller,
    )
    .track_order(&order)
    .await?;
    Ok(Json(tracking))
}

// =============================================================================
// Admin
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct AdminOrderQuery {
    pub status: Option<OrderStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

/// GET /api/admin/orders?status=&page=&limit=
///
/// # Errors
///
/// Returns 500 if the database query fails.
pub async fn admin_index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<AdminOrderQuery>,
) -> Result<Json<Page<Order>>> {
    let (page, limit) = PageQuery {
        page: query.page,
        limit: query.limit,
    }
    .normalized();
    let (orders, total) = OrderRepository::new(state.pool())
        .list_all(query.status, limit, (page - 1) * limit)
        .await?;
    Ok(Json(Page::new(orders, total, page, limit)))
}

/// An order with every gateway payment recorded against it.
#[derive(Debug, Serialize)]
pub struct AdminOrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub payments: Vec<Payment>,
}

/// GET /api/admin/orders/{id}
///
/// # Errors
///
/// Returns 404 for an unknown order, 500 if a query fails.
pub async fn admin_show(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
) -> Result<Json<AdminOrderDetail>> {
    let order = order_service(&state).get_for(&admin, id).await?;
    let payments = PaymentRepository::new(state.pool())
        .list_for_order(order.id)
        .await?;
    Ok(Json(AdminOrderDetail { order, payments }))
}

/// PUT /api/admin/orders/{id}/status
///
/// Orders only move forward through fulfilment. Cancelling goes through the
/// same path as a buyer cancellation so stock and money are returned.
///
/// # Errors
///
/// Returns 400 for a backwards or terminal move, 404 for an unknown order,
/// 409 if the order changed concurrently.
#[instrument(skip(state), fields(admin_id = %admin.id))]
pub async fn admin_update_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
    Json(body): Json<StatusUpdate>,
) -> Result<Json<Order>> {
    let service = order_service(&state);
    let order = service.get_for(&admin, id).await?;

    if !order.status.can_transition_to(body.status) {
        return Err(AppError::BadRequest(format!(
            "Cannot move an order from {} to {}",
            order.status, body.status
        )));
    }

    if body.status == OrderStatus::Cancelled {
        return Ok(Json(service.cancel(&admin, id).await?));
    }

    let updated = OrderRepository::new(state.pool())
        .update_status(id, order.status, body.status)
        .await?;
    tracing::info!(
        order_number = %updated.order_number,
        from = %order.status,
        to = %updated.status,
        "Order status changed"
    );
    Ok(Json(updated))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::order::tests::sample_order;

    #[test]
    fn test_admin_detail_inlines_order_fields() {
        let order = sample_order();
        let json = serde_json::to_value(AdminOrderDetail {
            order: order.clone(),
            payments: Vec::new(),
        })
        .unwrap();

        assert_eq!(json["orderNumber"], order.order_number.as_str());
        assert!(json.get("order").is_none());
        assert_eq!(json["payments"], serde_json::json!([]));
    }
}

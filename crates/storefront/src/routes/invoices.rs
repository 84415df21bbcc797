//! Printable GST invoices.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, State};
use tracing::instrument;

use wholesale_core::OrderId;

use crate::db::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::services::invoice::Invoice;
use crate::services::orders::OrderService;
use crate::state::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "invoice.html")]
pub struct InvoiceTemplate {
    pub invoice: Invoice,
}

/// GET /api/invoices/{orderId}
///
/// # Errors
///
/// Returns 404 for someone else's order or one that has not been invoiced
/// yet (prepaid orders are invoiced once payment is confirmed).
#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(order_id): Path<OrderId>,
) -> Result<InvoiceTemplate> {
    let order = OrderService::new(state.pool(), state.delhivery())
        .get_for(&user, order_id)
        .await?;

    let buyer = UserRepository::new(state.pool()).get_by_id(order.user_id).await?;
    let (business, gstin) = buyer.map_or((None, None), |b| (b.business_name, b.gstin));

    let invoice = Invoice::for_order(&order, &state.config().seller, business, gstin)
        .ok_or_else(|| AppError::NotFound("Invoice".to_string()))?;

    Ok(InvoiceTemplate { invoice })
}

//! Razorpay payment flow.
//!
//! Both the browser callback (`verify`) and the `payment.captured` webhook
//! funnel into [`PaymentRepository::confirm`]. Whichever arrives first
//! confirms the order and runs the follow-up work; the other is a replay.
//!
//! Follow-up work after a confirmed order (confirmation email, automatic
//! shipment) is independent: each step logs and reports its own failure and
//! never affects the payment.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use wholesale_core::{OrderId, OrderStatus, PaymentMethod, PaymentStatus};

use super::shipping::ShippingService;
use crate::db::payments::NewPayment;
use crate::db::{ConfirmOutcome, OrderRepository, PaymentRepository, RepositoryError, UserRepository};
use crate::models::{CurrentUser, Order};
use crate::razorpay::{PaymentEntity, RazorpayError, WebhookEvent};
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Order not found")]
    OrderNotFound,

    #[error("{0}")]
    NotPayable(&'static str),

    #[error("invalid payment signature")]
    InvalidSignature,

    #[error("payment gateway error: {0}")]
    Razorpay(RazorpayError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<RazorpayError> for PaymentError {
    fn from(e: RazorpayError) -> Self {
        match e {
            RazorpayError::InvalidSignature => Self::InvalidSignature,
            other => Self::Razorpay(other),
        }
    }
}

/// What the browser needs to open the Razorpay checkout.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayOrder {
    pub key_id: String,
    pub razorpay_order_id: String,
    /// Amount in paise.
    pub amount: i64,
    pub currency: &'static str,
    pub order_id: OrderId,
    pub order_number: String,
}

/// Fields the checkout widget hands back after payment.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyRequest {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

/// Why an order cannot be paid online right now, if anything.
#[must_use]
pub fn payment_blocker(order: &Order) -> Option<&'static str> {
    if order.payment_method != PaymentMethod::Razorpay {
        return Some("This order is not paid online");
    }
    if order.status == OrderStatus::Cancelled {
        return Some("This order has been cancelled");
    }
    if order.payment_status == PaymentStatus::Completed {
        return Some("This order has already been paid");
    }
    if order.total <= Decimal::ZERO {
        return Some("Nothing left to pay on this order");
    }
    None
}

pub struct PaymentService<'a> {
    state: &'a AppState,
}

impl<'a> PaymentService<'a> {
    #[must_use]
    pub const fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    fn orders(&self) -> OrderRepository<'a> {
        OrderRepository::new(self.state.pool())
    }

    fn payments(&self) -> PaymentRepository<'a> {
        PaymentRepository::new(self.state.pool())
    }

    /// Create (or reuse) the gateway order for one of the user's orders.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::OrderNotFound` for someone else's order,
    /// `PaymentError::NotPayable` if it cannot be paid online, or the
    /// gateway error.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn create_gateway_order(
        &self,
        user: &CurrentUser,
        order_id: OrderId,
    ) -> Result<GatewayOrder, PaymentError> {
        let order = self
            .orders()
            .get(order_id)
            .await?
            .filter(|o| o.user_id == user.id)
            .ok_or(PaymentError::OrderNotFound)?;
        if let Some(reason) = payment_blocker(&order) {
            return Err(PaymentError::NotPayable(reason));
        }

        let amount = wholesale_core::to_paise(order.total)
            .ok_or(PaymentError::NotPayable("Order total is out of range"))?;

        let razorpay_order_id = match &order.razorpay_order_id {
            Some(existing) => existing.clone(),
            None => {
                let notes = serde_json::json!({
                    "order_id": order.id.to_string(),
                    "order_number": order.order_number,
                });
                let created = self
                    .state
                    .razorpay()
                    .create_order(order.total, &order.order_number, notes)
                    .await?;
                self.orders()
                    .set_razorpay_order_id(order.id, &created.id)
                    .await?;
                created.id
            }
        };

        Ok(GatewayOrder {
            key_id: self.state.razorpay().key_id().to_string(),
            razorpay_order_id,
            amount,
            currency: wholesale_core::CURRENCY,
            order_id: order.id,
            order_number: order.order_number,
        })
    }

    /// Check the checkout signature and confirm the order.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidSignature` on a bad signature or
    /// `PaymentError::OrderNotFound` if the gateway order is not the user's.
    #[instrument(skip(self, user, request), fields(user_id = %user.id))]
    pub async fn verify(
        &self,
        user: &CurrentUser,
        request: &VerifyRequest,
    ) -> Result<Order, PaymentError> {
        self.state.razorpay().verify_payment_signature(
            &request.razorpay_order_id,
            &request.razorpay_payment_id,
            &request.razorpay_signature,
        )?;

        let order = self
            .orders()
            .get_by_razorpay_order_id(&request.razorpay_order_id)
            .await?
            .filter(|o| o.user_id == user.id)
            .ok_or(PaymentError::OrderNotFound)?;

        let payment = NewPayment {
            razorpay_payment_id: &request.razorpay_payment_id,
            razorpay_order_id: Some(&request.razorpay_order_id),
            amount: order.total,
            currency: wholesale_core::CURRENCY,
            method: None,
            error_description: None,
            raw_event: None,
        };
        let outcome = self.payments().confirm(order.id, &payment).await?;
        Ok(self.finish(outcome).await)
    }

    /// Verify and process a webhook delivery.
    ///
    /// Once the signature checks out, problems with the event itself (unknown
    /// order, unparseable body) are logged and swallowed so the gateway does
    /// not keep retrying.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidSignature` for a bad signature, or a
    /// database error so the gateway retries.
    #[instrument(skip_all)]
    pub async fn handle_webhook(&self, body: &[u8], signature: &str) -> Result<(), PaymentError> {
        self.state
            .razorpay()
            .verify_webhook_signature(body, signature)?;

        let raw: serde_json::Value = match serde_json::from_slice(body) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Unparseable webhook body");
                return Ok(());
            }
        };
        let event: WebhookEvent = match serde_json::from_value(raw.clone()) {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "Unexpected webhook shape");
                return Ok(());
            }
        };

        let Some(entity) = event.payment() else {
            info!(event = %event.event, "Webhook without payment entity ignored");
            return Ok(());
        };

        match event.event.as_str() {
            "payment.captured" => self.on_captured(entity, &raw).await,
            "payment.failed" => self.on_failed(entity, &raw).await,
            other => {
                info!(event = %other, "Webhook event ignored");
                Ok(())
            }
        }
    }

    /// Find our order for a gateway payment: notes first, then gateway order ID.
    async fn order_for(&self, entity: &PaymentEntity) -> Result<Option<Order>, PaymentError> {
        if let Some(id) = entity.note_order_id()
            && let Some(order) = self.orders().get(OrderId::new(id)).await?
        {
            return Ok(Some(order));
        }
        match &entity.order_id {
            Some(rzp_order) => Ok(self.orders().get_by_razorpay_order_id(rzp_order).await?),
            None => Ok(None),
        }
    }

    async fn on_captured(
        &self,
        entity: &PaymentEntity,
        raw: &serde_json::Value,
    ) -> Result<(), PaymentError> {
        let Some(order) = self.order_for(entity).await? else {
            warn!(payment_id = %entity.id, "Captured payment for unknown order");
            return Ok(());
        };

        let amount = wholesale_core::from_paise(entity.amount);
        if amount != order.total {
            warn!(
                order_number = %order.order_number,
                expected = %order.total,
                received = %amount,
                "Captured amount differs from order total"
            );
        }

        let payment = NewPayment {
            razorpay_payment_id: &entity.id,
            razorpay_order_id: entity.order_id.as_deref(),
            amount,
            currency: &entity.currency,
            method: entity.method.as_deref(),
            error_description: None,
            raw_event: Some(raw),
        };
        let outcome = self.payments().confirm(order.id, &payment).await?;
        self.finish(outcome).await;
        Ok(())
    }

    async fn on_failed(
        &self,
        entity: &PaymentEntity,
        raw: &serde_json::Value,
    ) -> Result<(), PaymentError> {
        let Some(order) = self.order_for(entity).await? else {
            warn!(payment_id = %entity.id, "Failed payment for unknown order");
            return Ok(());
        };

        let payment = NewPayment {
            razorpay_payment_id: &entity.id,
            razorpay_order_id: entity.order_id.as_deref(),
            amount: wholesale_core::from_paise(entity.amount),
            currency: &entity.currency,
            method: entity.method.as_deref(),
            error_description: entity.error_description.as_deref(),
            raw_event: Some(raw),
        };
        if self.payments().record_failure(order.id, &payment).await? {
            info!(
                order_number = %order.order_number,
                reason = entity.error_description.as_deref().unwrap_or("unknown"),
                "Payment failed"
            );
        }
        Ok(())
    }

    async fn finish(&self, outcome: ConfirmOutcome) -> Order {
        match outcome {
            ConfirmOutcome::Confirmed(order) => {
                info!(order_number = %order.order_number, "Payment confirmed");
                on_order_confirmed(self.state, &order).await;
                order
            }
            ConfirmOutcome::Replay(order) => {
                info!(order_number = %order.order_number, "Payment already recorded");
                order
            }
            ConfirmOutcome::RefundedToWallet(order) => {
                warn!(
                    order_number = %order.order_number,
                    "Payment captured for a cancelled order; credited to the buyer's wallet"
                );
                order
            }
        }
    }
}

/// Follow-up work for a newly confirmed order. Never fails.
pub async fn on_order_confirmed(state: &AppState, order: &Order) {
    if order.status == OrderStatus::Cancelled {
        warn!(
            order_number = %order.order_number,
            "Payment received for a cancelled order; skipping fulfilment"
        );
        return;
    }

    send_confirmation_email(state, order).await;

    if state.config().delhivery.auto_ship {
        let shipping = ShippingService::new(
            state.pool(),
            state.delhivery(),
            &state.config().delhivery,
            &state.config().seller,
        );
        if let Err(e) = shipping.create_for(order, None).await {
            error!(order_number = %order.order_number, error = %e, "Automatic shipment failed");
            sentry::capture_error(&e);
        }
    }
}

async fn send_confirmation_email(state: &AppState, order: &Order) {
    let Some(email) = state.email() else {
        return;
    };

    let recipient = match UserRepository::new(state.pool()).get_by_id(order.user_id).await {
        Ok(Some(user)) => user.email,
        Ok(None) => None,
        Err(e) => {
            error!(error = %e, "Failed to load user for confirmation email");
            None
        }
    };
    let Some(to) = recipient else {
        info!(order_number = %order.order_number, "No email on file, skipping confirmation");
        return;
    };

    if let Err(e) = email.send_order_confirmation(to.as_str(), order).await {
        error!(order_number = %order.order_number, error = %e, "Confirmation email failed");
        sentry::capture_error(&e);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::order::tests::sample_order;

    fn unpaid() -> Order {
        let mut order = sample_order();
        order.payment_status = PaymentStatus::Pending;
        order.status = OrderStatus::Pending;
        order
    }

    #[test]
    fn test_unpaid_online_order_is_payable() {
        assert!(payment_blocker(&unpaid()).is_none());
    }

    #[test]
    fn test_paid_order_not_payable() {
        assert_eq!(
            payment_blocker(&sample_order()),
            Some("This order has already been paid")
        );
    }

    #[test]
    fn test_cod_and_cancelled_not_payable() {
        let mut order = unpaid();
        order.payment_method = PaymentMethod::Cod;
        assert!(payment_blocker(&order).is_some());

        let mut order = unpaid();
        order.status = OrderStatus::Cancelled;
        assert!(payment_blocker(&order).is_some());
    }

    #[test]
    fn test_signature_error_maps_to_invalid_signature() {
        assert!(matches!(
            PaymentError::from(RazorpayError::InvalidSignature),
            PaymentError::InvalidSignature
        ));
    }
}

//! Razorpay request and response types.

use serde::{Deserialize, Serialize};

/// Body for `POST /v1/orders`.
#[derive(Debug, Serialize)]
pub(super) struct CreateOrderRequest<'a> {
    /// Amount in paise.
    pub amount: i64,
    pub currency: &'a str,
    pub receipt: &'a str,
    pub notes: serde_json::Value,
}

/// A Razorpay order.
#[derive(Debug, Clone, Deserialize)]
pub struct RazorpayOrder {
    pub id: String,
    /// Amount in paise.
    pub amount: i64,
    pub currency: String,
    pub receipt: Option<String>,
    pub status: String,
}

/// Error envelope returned on non-2xx responses.
#[derive(Debug, Deserialize)]
pub(super) struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorDetail {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

/// Webhook delivery envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub payload: WebhookPayload,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    pub payment: Option<EntityWrapper>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntityWrapper {
    pub entity: PaymentEntity,
}

/// The `payment` entity inside a webhook payload.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEntity {
    pub id: String,
    /// Amount in paise.
    pub amount: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub status: Option<String>,
    pub order_id: Option<String>,
    pub method: Option<String>,
    pub error_description: Option<String>,
    /// An object when notes were set at order creation, `[]` otherwise.
    #[serde(default)]
    pub notes: serde_json::Value,
}

fn default_currency() -> String {
    wholesale_core::CURRENCY.to_string()
}

impl WebhookEvent {
    /// The payment entity, if this event carries one.
    #[must_use]
    pub fn payment(&self) -> Option<&PaymentEntity> {
        self.payload.payment.as_ref().map(|p| &p.entity)
    }
}

impl PaymentEntity {
    /// Our order ID as stored in the gateway order's notes.
    #[must_use]
    pub fn note_order_id(&self) -> Option<i64> {
        match self.notes.get("order_id")? {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const CAPTURED: &str = r#"{
        "entity": "event",
        "event": "payment.captured",
        "payload": {
            "payment": {
                "entity": {
                    "id": "pay_29QQoUBi66xm2f",
                    "entity": "payment",
                    "amount": 130000,
                    "currency": "INR",
                    "status": "captured",
                    "order_id": "order_9A33XWu170gUtm",
                    "method": "upi",
                    "notes": {"order_id": "42", "order_number": "WH260301ABCDEF"}
                }
            }
        }
    }"#;

    #[test]
    fn test_parse_captured_event() {
        let event: WebhookEvent = serde_json::from_str(CAPTURED).unwrap();
        assert_eq!(event.event, "payment.captured");
        let payment = event.payment().unwrap();
        assert_eq!(payment.amount, 130_000);
        assert_eq!(payment.order_id.as_deref(), Some("order_9A33XWu170gUtm"));
        assert_eq!(payment.note_order_id(), Some(42));
    }

    #[test]
    fn test_empty_notes_array() {
        let json = r#"{"event":"payment.failed","payload":{"payment":{"entity":{
            "id":"pay_1","amount":100,"notes":[],"error_description":"Card declined"}}}}"#;
        let event: WebhookEvent = serde_json::from_str(json).unwrap();
        let payment = event.payment().unwrap();
        assert_eq!(payment.note_order_id(), None);
        assert_eq!(payment.currency, "INR");
        assert_eq!(payment.error_description.as_deref(), Some("Card declined"));
    }

    #[test]
    fn test_event_without_payment() {
        let event: WebhookEvent =
            serde_json::from_str(r#"{"event":"order.paid","payload":{}}"#).unwrap();
        assert!(event.payment().is_none());
    }
}

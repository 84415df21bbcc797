//! Razorpay REST API client and signature checks.

use std::sync::Arc;

use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use tracing::{debug, instrument, warn};

use super::error::RazorpayError;
use super::types::{CreateOrderRequest, ErrorResponse, RazorpayOrder};
use crate::config::RazorpayConfig;

/// Razorpay REST API base URL.
const RAZORPAY_API_BASE: &str = "https://api.razorpay.com/v1";

/// Razorpay API client.
///
/// Cheap to clone; the HTTP client and credentials are shared.
#[derive(Clone)]
pub struct RazorpayClient {
    inner: Arc<RazorpayClientInner>,
}

struct RazorpayClientInner {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: SecretString,
    webhook_secret: SecretString,
}

impl std::fmt::Debug for RazorpayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayClient")
            .field("key_id", &self.inner.key_id)
            .field("key_secret", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl RazorpayClient {
    /// Create a new Razorpay client.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created. This should never happen
    /// under normal circumstances as we use standard TLS configuration.
    #[must_use]
    pub fn new(config: &RazorpayConfig) -> Self {
        Self::with_base_url(config, RAZORPAY_API_BASE)
    }

    /// Create a client pointing at a different API base (tests, proxies).
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created.
    #[must_use]
    pub fn with_base_url(config: &RazorpayConfig, base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            inner: Arc::new(RazorpayClientInner {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
                key_id: config.key_id.clone(),
                key_secret: config.key_secret.clone(),
                webhook_secret: config.webhook_secret.clone(),
            }),
        }
    }

    /// Public key ID, handed to the browser checkout.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.inner.key_id
    }

    /// Create a gateway order for `amount` rupees.
    ///
    /// `notes` are echoed back on every payment of this order, which lets the
    /// webhook find our order without a lookup by gateway ID.
    ///
    /// # Errors
    ///
    /// Returns `RazorpayError::InvalidAmount` if the amount is not positive,
    /// or an HTTP/API error if the request fails.
    #[instrument(skip(self, notes), fields(receipt = %receipt))]
    pub async fn create_order(
        &self,
        amount: Decimal,
        receipt: &str,
        notes: serde_json::Value,
    ) -> Result<RazorpayOrder, RazorpayError> {
        let paise = wholesale_core::to_paise(amount)
            .filter(|p| *p > 0)
            .ok_or_else(|| RazorpayError::InvalidAmount(amount.to_string()))?;

        let body = CreateOrderRequest {
            amount: paise,
            currency: wholesale_core::CURRENCY,
            receipt,
            notes,
        };

        let response = self
            .inner
            .client
            .post(format!("{}/orders", self.inner.base_url))
            .basic_auth(&self.inner.key_id, Some(self.inner.key_secret.expose_secret()))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .ok()
                .map(|e| {
                    let code = e.error.code.unwrap_or_default();
                    let description = e.error.description.unwrap_or_default();
                    format!("{code} {description}").trim().to_string()
                })
                .unwrap_or_else(|| status.to_string());
            warn!(status = status.as_u16(), %message, "Razorpay order creation failed");
            return Err(RazorpayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let order: RazorpayOrder = response.json().await?;
        debug!(razorpay_order_id = %order.id, amount = order.amount, "Razorpay order created");
        Ok(order)
    }

    /// Verify the signature the checkout widget returns to the browser:
    /// `HMAC-SHA256(key_secret, "{order_id}|{payment_id}")` as hex.
    ///
    /// # Errors
    ///
    /// Returns `RazorpayError::InvalidSignature` on mismatch.
    pub fn verify_payment_signature(
        &self,
        razorpay_order_id: &str,
        razorpay_payment_id: &str,
        signature: &str,
    ) -> Result<(), RazorpayError> {
        let message = format!("{razorpay_order_id}|{razorpay_payment_id}");
        verify_hmac(&self.inner.key_secret, message.as_bytes(), signature)
    }

    /// Verify the `X-Razorpay-Signature` header of a webhook against the raw
    /// request body.
    ///
    /// # Errors
    ///
    /// Returns `RazorpayError::InvalidSignature` on mismatch.
    pub fn verify_webhook_signature(&self, body: &[u8], signature: &str) -> Result<(), RazorpayError> {
        verify_hmac(&self.inner.webhook_secret, body, signature)
    }
}

/// Hex HMAC-SHA256 of `message` under `secret`.
pub(crate) fn sign(secret: &SecretString, message: &[u8]) -> Result<String, RazorpayError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|_| RazorpayError::InvalidSignature)?;
    mac.update(message);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn verify_hmac(secret: &SecretString, message: &[u8], signature: &str) -> Result<(), RazorpayError> {
    let expected = sign(secret, message)?;
    if !constant_time_compare(&expected, signature.trim()) {
        return Err(RazorpayError::InvalidSignature);
    }
    Ok(())
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> RazorpayClient {
        RazorpayClient::new(&RazorpayConfig {
            key_id: "rzp_test_123".to_string(),
            key_secret: SecretString::from("key-secret"),
            webhook_secret: SecretString::from("webhook-secret"),
        })
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }

    #[test]
    fn test_payment_signature_valid() {
        let client = client();
        let signature = sign(&SecretString::from("key-secret"), b"order_1|pay_1").unwrap();
        assert!(
            client
                .verify_payment_signature("order_1", "pay_1", &signature)
                .is_ok()
        );
    }

    #[test]
    fn test_payment_signature_rejects_swapped_ids() {
        let client = client();
        let signature = sign(&SecretString::from("key-secret"), b"order_1|pay_1").unwrap();
        assert!(matches!(
            client.verify_payment_signature("pay_1", "order_1", &signature),
            Err(RazorpayError::InvalidSignature)
        ));
    }

    #[test]
    fn test_webhook_signature_uses_webhook_secret() {
        let client = client();
        let body = br#"{"event":"payment.captured"}"#;

        let good = sign(&SecretString::from("webhook-secret"), body).unwrap();
        assert!(client.verify_webhook_signature(body, &good).is_ok());

        let wrong_secret = sign(&SecretString::from("key-secret"), body).unwrap();
        assert!(client.verify_webhook_signature(body, &wrong_secret).is_err());
    }

    #[test]
    fn test_webhook_signature_detects_tampering() {
        let client = client();
        let signature = sign(&SecretString::from("webhook-secret"), b"{\"amount\":100}").unwrap();
        assert!(
            client
                .verify_webhook_signature(b"{\"amount\":999}", &signature)
                .is_err()
        );
    }

    #[test]
    fn test_known_vector() {
        // RFC 4231 test case 2
        let sig = sign(
            &SecretString::from("Jefe"),
            b"what do ya want for nothing?",
        )
        .unwrap();
        assert_eq!(
            sig,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[tokio::test]
    async fn test_create_order_rejects_zero_amount() {
        let result = client()
            .create_order(Decimal::ZERO, "WH1", serde_json::json!({}))
            .await;
        assert!(matches!(result, Err(RazorpayError::InvalidAmount(_))));
    }
}

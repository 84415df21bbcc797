//! OTP delivery over an HTTP SMS gateway.

use secrecy::{ExposeSecret, SecretString};
use tracing::{info, instrument, warn};

use wholesale_core::Phone;

use super::AuthError;
use crate::config::OtpConfig;

/// Sends sign-in codes by SMS, or logs them in dev mode.
#[derive(Clone)]
pub struct OtpSender {
    client: reqwest::Client,
    api_url: Option<String>,
    api_key: Option<SecretString>,
    dev_mode: bool,
}

impl std::fmt::Debug for OtpSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtpSender")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("dev_mode", &self.dev_mode)
            .finish()
    }
}

impl OtpSender {
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created.
    #[must_use]
    pub fn new(config: &OtpConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_url: config.sms_api_url.clone(),
            api_key: config.sms_api_key.clone(),
            dev_mode: config.dev_mode,
        }
    }

    /// Deliver `code` to `phone`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Delivery` if no gateway is configured outside dev
    /// mode, or the gateway rejects the message.
    #[instrument(skip(self, code), fields(phone = %phone.masked()))]
    pub async fn send(&self, phone: &Phone, code: &str) -> Result<(), AuthError> {
        let Some(url) = &self.api_url else {
            if self.dev_mode {
                info!(otp = %code, "OTP generated (dev mode, not sent)");
                return Ok(());
            }
            return Err(AuthError::Delivery("SMS gateway not configured".to_string()));
        };

        let message = format!("{code} is your sign-in code. It expires in 10 minutes.");
        let mut request = self.client.post(url).json(&serde_json::json!({
            "to": phone.e164(),
            "message": message,
        }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| AuthError::Delivery(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            warn!(%status, "SMS gateway rejected OTP");
            return Err(AuthError::Delivery(format!("gateway returned {status}")));
        }

        if self.dev_mode {
            info!(otp = %code, "OTP sent (dev mode)");
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sender(dev_mode: bool) -> OtpSender {
        OtpSender::new(&OtpConfig {
            dev_mode,
            sms_api_url: None,
            sms_api_key: None,
        })
    }

    #[tokio::test]
    async fn test_dev_mode_without_gateway_succeeds() {
        let phone = Phone::parse("9876543210").unwrap();
        assert!(sender(true).send(&phone, "123456").await.is_ok());
    }

    #[tokio::test]
    async fn test_no_gateway_outside_dev_mode_fails() {
        let phone = Phone::parse("9876543210").unwrap();
        assert!(matches!(
            sender(false).send(&phone, "123456").await,
            Err(AuthError::Delivery(_))
        ));
    }
}

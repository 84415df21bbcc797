//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;
use tracing::info;
use url::Url;

use crate::config::StorefrontConfig;
use crate::delhivery::DelhiveryClient;
use crate::razorpay::RazorpayClient;
use crate::services::auth::OtpSender;
use crate::services::email::EmailService;

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("invalid site_url: {0}")]
    InvalidSiteUrl(#[from] url::ParseError),
    #[error("site_url must have a host")]
    MissingHost,
    #[error("email transport: {0}")]
    Email(#[from] lettre::transport::smtp::Error),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and API clients.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    site_origin: Url,
    razorpay: RazorpayClient,
    delhivery: DelhiveryClient,
    otp_sender: OtpSender,
    email: Option<EmailService>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the site URL is invalid or the SMTP relay cannot
    /// be configured.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let site_origin = Url::parse(&config.site_url)?;
        if site_origin.host_str().is_none() {
            return Err(StateError::MissingHost);
        }

        let razorpay = RazorpayClient::new(&config.razorpay);
        let delhivery = DelhiveryClient::new(&config.delhivery);
        let otp_sender = OtpSender::new(&config.otp);
        let email = match &config.email {
            Some(email_config) => Some(EmailService::new(email_config, &config.site_url)?),
            None => {
                info!("SMTP not configured, order emails disabled");
                None
            }
        };

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                site_origin,
                razorpay,
                delhivery,
                otp_sender,
                email,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// The frontend origin (`scheme://host[:port]`), used for CORS.
    #[must_use]
    pub fn site_origin(&self) -> String {
        self.inner.site_origin.origin().ascii_serialization()
    }

    #[must_use]
    pub fn razorpay(&self) -> &RazorpayClient {
        &self.inner.razorpay
    }

    #[must_use]
    pub fn delhivery(&self) -> &DelhiveryClient {
        &self.inner.delhivery
    }

    #[must_use]
    pub fn otp_sender(&self) -> &OtpSender {
        &self.inner.otp_sender
    }

    /// The email service, when SMTP is configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;

    #[tokio::test]
    async fn test_site_origin_strips_path() {
        let mut config = test_config();
        config.site_url = "https://shop.example.com/app/".to_string();
        let pool = PgPool::connect_lazy("postgres://localhost/unused").unwrap();
        let state = AppState::new(config, pool).unwrap();
        assert_eq!(state.site_origin(), "https://shop.example.com");
        assert!(state.email().is_none());
    }

    #[tokio::test]
    async fn test_rejects_invalid_site_url() {
        let mut config = test_config();
        config.site_url = "not a url".to_string();
        let pool = PgPool::connect_lazy("postgres://localhost/unused").unwrap();
        assert!(AppState::new(config, pool).is_err());
    }
}

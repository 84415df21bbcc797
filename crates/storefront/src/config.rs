//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//! - `STOREFRONT_SESSION_SECRET` - Session signing secret (min 32 chars)
//! - `RAZORPAY_KEY_ID` - Razorpay API key id (public, sent to checkout)
//! - `RAZORPAY_KEY_SECRET` - Razorpay API key secret
//! - `RAZORPAY_WEBHOOK_SECRET` - Secret configured on the Razorpay webhook
//! - `DELHIVERY_TOKEN` - Delhivery API token
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 5000)
//! - `SITE_URL` / `NEXT_PUBLIC_SITE_URL` - Public frontend URL, used for CORS
//!   and links in emails (default: `http://localhost:3000`)
//! - `DELHIVERY_API_URL` - Delhivery API base (default: `https://track.delhivery.com`)
//! - `DELHIVERY_TRACK_API_URL` - Tracking API base (default: same as API base)
//! - `DELHIVERY_PICKUP_LOCATION` - Registered warehouse name used for shipments
//! - `DELHIVERY_ORIGIN_PINCODE` - Pincode shipments leave from (TAT quotes)
//! - `DELHIVERY_AUTO_SHIP` - Create a shipment as soon as an order is paid (default: false)
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `EMAIL_FROM` -
//!   Transactional email; disabled when `SMTP_HOST` is unset
//! - `SMS_API_URL`, `SMS_API_KEY` - HTTP SMS gateway for OTP delivery
//! - `OTP_DEV_MODE` - Log OTPs instead of sending them (default: false)
//! - `SELLER_NAME`, `SELLER_GSTIN`, `SELLER_ADDRESS`, `SELLER_STATE` - Invoice header
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT` - Sentry error tracking

use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;

/// Blocklist of common placeholder patterns (case-insensitive).
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "your_",
    "changeme",
    "replace",
    "placeholder",
    "xxx",
    "todo",
    "insert",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public URL of the frontend
    pub site_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    pub razorpay: RazorpayConfig,
    pub delhivery: DelhiveryConfig,
    /// SMTP settings; `None` disables email.
    pub email: Option<EmailConfig>,
    pub otp: OtpConfig,
    pub seller: SellerConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
}

/// Razorpay credentials.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: SecretString,
    pub webhook_secret: SecretString,
}

impl std::fmt::Debug for RazorpayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayConfig")
            .field("key_id", &self.key_id)
            .field("key_secret", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .finish()
    }
}

/// Delhivery API settings.
#[derive(Clone)]
pub struct DelhiveryConfig {
    pub token: SecretString,
    pub api_url: String,
    pub track_api_url: String,
    /// Default pickup location (registered warehouse name).
    pub pickup_location: Option<String>,
    pub origin_pincode: Option<String>,
    pub auto_ship: bool,
}

impl std::fmt::Debug for DelhiveryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelhiveryConfig")
            .field("token", &"[REDACTED]")
            .field("api_url", &self.api_url)
            .field("track_api_url", &self.track_api_url)
            .field("pickup_location", &self.pickup_location)
            .field("origin_pincode", &self.origin_pincode)
            .field("auto_ship", &self.auto_ship)
            .finish()
    }
}

/// SMTP configuration.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: SecretString,
    pub from_address: String,
}

/// OTP delivery settings.
#[derive(Debug, Clone, Default)]
pub struct OtpConfig {
    /// Log codes instead of sending them. Never enable in production.
    pub dev_mode: bool,
    pub sms_api_url: Option<String>,
    pub sms_api_key: Option<SecretString>,
}

/// Seller details printed on invoices.
#[derive(Debug, Clone)]
pub struct SellerConfig {
    pub name: String,
    pub gstin: Option<String>,
    pub address: String,
    /// State used to decide between CGST+SGST and IGST.
    pub state: String,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets look like placeholders.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("STOREFRONT_PORT", "5000")?;
        let site_url = get_optional_env("SITE_URL")
            .or_else(|| get_optional_env("NEXT_PUBLIC_SITE_URL"))
            .unwrap_or_else(|| "http://localhost:3000".to_string());
        let session_secret = get_required_secret("STOREFRONT_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "STOREFRONT_SESSION_SECRET")?;

        Ok(Self {
            database_url,
            host,
            port,
            site_url: site_url.trim_end_matches('/').to_string(),
            session_secret,
            razorpay: RazorpayConfig::from_env()?,
            delhivery: DelhiveryConfig::from_env()?,
            email: EmailConfig::from_env()?,
            otp: OtpConfig::from_env()?,
            seller: SellerConfig::from_env(),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` flag.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.site_url.starts_with("https://")
    }
}

impl RazorpayConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            key_id: get_required_env("RAZORPAY_KEY_ID")?,
            key_secret: get_validated_secret("RAZORPAY_KEY_SECRET")?,
            webhook_secret: get_validated_secret("RAZORPAY_WEBHOOK_SECRET")?,
        })
    }
}

impl DelhiveryConfig {
    /// Load only the courier settings, for tools that do not need the rest.
    ///
    /// # Errors
    ///
    /// Returns an error if `DELHIVERY_TOKEN` is missing or a flag is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_url = get_env_or_default("DELHIVERY_API_URL", "https://track.delhivery.com")
            .trim_end_matches('/')
            .to_string();
        let track_api_url = get_optional_env("DELHIVERY_TRACK_API_URL")
            .map_or_else(|| api_url.clone(), |u| u.trim_end_matches('/').to_string());

        Ok(Self {
            token: get_validated_secret("DELHIVERY_TOKEN")?,
            api_url,
            track_api_url,
            pickup_location: get_optional_env("DELHIVERY_PICKUP_LOCATION"),
            origin_pincode: get_optional_env("DELHIVERY_ORIGIN_PINCODE"),
            auto_ship: parse_bool("DELHIVERY_AUTO_SHIP")?,
        })
    }
}

impl EmailConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };

        Ok(Some(Self {
            smtp_host,
            smtp_port: parse_env("SMTP_PORT", "587")?,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_required_secret("SMTP_PASSWORD")?,
            from_address: get_required_env("EMAIL_FROM")?,
        }))
    }
}

impl OtpConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dev_mode: parse_bool("OTP_DEV_MODE")?,
            sms_api_url: get_optional_env("SMS_API_URL"),
            sms_api_key: get_optional_env("SMS_API_KEY").map(SecretString::from),
        })
    }
}

impl SellerConfig {
    fn from_env() -> Self {
        Self {
            name: get_env_or_default("SELLER_NAME", "Wholesale Storefront"),
            gstin: get_optional_env("SELLER_GSTIN"),
            address: get_env_or_default("SELLER_ADDRESS", ""),
            state: get_env_or_default("SELLER_STATE", "Delhi"),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    get_required_env(key).map(SecretString::from)
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConfigError::MissingEnvVar(primary_key.to_string()))
}

fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_bool(key: &str) -> Result<bool, ConfigError> {
    match get_optional_env(key).as_deref().map(str::to_ascii_lowercase).as_deref() {
        None | Some("0" | "false" | "no" | "off") => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some(other) => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    validate_not_placeholder(value, var_name)
}

/// Reject values copied verbatim from an `.env.example`.
fn validate_not_placeholder(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }
    if secret.trim().is_empty() {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            "is empty".to_string(),
        ));
    }
    Ok(())
}

fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_not_placeholder(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    /// A complete configuration for unit tests that need one.
    pub(crate) fn test_config() -> StorefrontConfig {
        StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/wholesale_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 5000,
            site_url: "http://localhost:3000".to_string(),
            session_secret: SecretString::from("k".repeat(32)),
            razorpay: RazorpayConfig {
                key_id: "rzp_test_abc123".to_string(),
                key_secret: SecretString::from("test_key_secret"),
                webhook_secret: SecretString::from("test_webhook_secret"),
            },
            delhivery: DelhiveryConfig {
                token: SecretString::from("test_delhivery_token"),
                api_url: "https://staging-express.delhivery.com".to_string(),
                track_api_url: "https://staging-express.delhivery.com".to_string(),
                pickup_location: Some("Main Warehouse".to_string()),
                origin_pincode: Some("110001".to_string()),
                auto_ship: false,
            },
            email: None,
            otp: OtpConfig {
                dev_mode: true,
                ..OtpConfig::default()
            },
            seller: SellerConfig {
                name: "Test Traders".to_string(),
                gstin: Some("07ABCDE1234F1Z5".to_string()),
                address: "12 Market Road, New Delhi".to_string(),
                state: "Delhi".to_string(),
            },
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    #[test]
    fn test_placeholder_rejected() {
        let err = validate_not_placeholder("your-razorpay-secret", "RAZORPAY_KEY_SECRET");
        assert!(matches!(err, Err(ConfigError::InsecureSecret(_, _))));
        assert!(validate_not_placeholder("changeme", "X").is_err());
    }

    #[test]
    fn test_real_looking_secret_accepted() {
        assert!(validate_not_placeholder("Jq8c2LwP0aXk4e1H", "X").is_ok());
    }

    #[test]
    fn test_session_secret_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_session_secret(&secret, "TEST_SESSION").is_err());
    }

    #[test]
    fn test_session_secret_valid_length() {
        let secret = SecretString::from("a".repeat(32));
        assert!(validate_session_secret(&secret, "TEST_SESSION").is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let addr = test_config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 5000);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = test_config();
        let razorpay = format!("{:?}", config.razorpay);
        let delhivery = format!("{:?}", config.delhivery);

        assert!(razorpay.contains("rzp_test_abc123"));
        assert!(!razorpay.contains("test_key_secret"));
        assert!(!razorpay.contains("test_webhook_secret"));
        assert!(!delhivery.contains("test_delhivery_token"));
        assert!(delhivery.contains("[REDACTED]"));
    }
}

//! Database operations for the storefront `PostgreSQL` database.
//!
//! ## Tables
//!
//! - `users`, `otp_codes`, `auth_tokens` - Phone/OTP accounts and API tokens
//! - `categories`, `products`, `reviews` - Catalog
//! - `cart_items` - Server-side carts keyed by `(user, product, variant)`
//! - `addresses` - Saved delivery addresses
//! - `coupons` - Discount codes
//! - `orders`, `payments` - Orders and gateway payment records
//! - `warehouses`, `shipments` - Courier pickup locations and waybills
//! - `wallet_transactions` - Store-credit ledger
//! - `tower_sessions.session` - Cookie session storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p wholesale-cli -- migrate
//! ```

pub mod addresses;
pub mod carts;
pub mod categories;
pub mod coupons;
pub mod orders;
pub mod otp;
pub mod payments;
pub mod products;
pub mod reviews;
pub mod shipments;
pub mod tokens;
pub mod users;
pub mod wallet;
pub mod warehouses;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use addresses::AddressRepository;
pub use carts::CartRepository;
pub use categories::CategoryRepository;
pub use coupons::CouponRepository;
pub use orders::OrderRepository;
pub use otp::OtpRepository;
pub use payments::{ConfirmOutcome, PaymentRepository};
pub use products::ProductRepository;
pub use reviews::ReviewRepository;
pub use shipments::ShipmentRepository;
pub use tokens::TokenRepository;
pub use users::UserRepository;
pub use wallet::WalletRepository;
pub use warehouses::WarehouseRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate slug).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique-violation into `Conflict`, passing other errors through.
    pub(crate) fn unique(e: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return Self::Conflict(message.to_owned());
        }
        Self::Database(e)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

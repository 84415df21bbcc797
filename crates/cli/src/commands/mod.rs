//! Subcommand implementations.

pub mod admin;
pub mod migrate;
pub mod seed;
pub mod smoke;

use secrecy::SecretString;
use sqlx::PgPool;

/// Database URL from the environment, preferring the storefront-specific name.
///
/// # Errors
///
/// Returns an error if neither variable is set.
pub fn database_url() -> Result<SecretString, &'static str> {
    dotenvy::dotenv().ok();

    std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| "DATABASE_URL not set")
}

/// Connect to the storefront database.
///
/// # Errors
///
/// Returns an error if the URL is missing or the connection fails.
pub async fn connect() -> Result<PgPool, Box<dyn std::error::Error>> {
    let url = database_url()?;
    tracing::info!("Connecting to database...");
    Ok(wholesale_storefront::db::create_pool(&url).await?)
}

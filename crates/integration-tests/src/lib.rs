//! Integration tests for the wholesale storefront.
//!
//! The tests in `tests/` talk to a running server over HTTP and reach into
//! its database only to plant OTP codes, so no SMS gateway is needed.
//!
//! # Running Tests
//!
//! ```bash
//! wh-cli migrate && wh-cli seed
//! cargo run -p wholesale-storefront &
//! cargo test -p wholesale-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_BASE_URL` - Server under test (default `http://localhost:5000`)
//! - `DATABASE_URL` - The same database the server uses

use reqwest::{Client, Response, StatusCode};
use serde_json::{Value, json};
use sqlx::PgPool;

/// Code planted for every sign-in.
pub const TEST_OTP: &str = "424242";

/// Base URL of the storefront under test.
#[must_use]
pub fn base_url() -> String {
    dotenvy::dotenv().ok();
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:5000".to_string())
}

/// A fresh client with its own cookie jar.
///
/// # Panics
///
/// Panics if the HTTP client cannot be built.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// A random, valid mobile number so tests never share an account.
#[must_use]
pub fn unique_phone() -> String {
    let n = uuid::Uuid::new_v4().as_u128() % 1_000_000_000;
    format!("9{n:09}")
}

/// Connect to the database the server uses.
///
/// # Panics
///
/// Panics if `DATABASE_URL` is unset or unreachable.
pub async fn pool() -> PgPool {
    dotenvy::dotenv().ok();
    let url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("DATABASE_URL must be set for integration tests");
    PgPool::connect(&url)
        .await
        .expect("Failed to connect to database")
}

/// Store a live OTP for `phone`, as the request endpoint would.
///
/// # Panics
///
/// Panics if the insert fails.
pub async fn plant_otp(pool: &PgPool, phone: &str, code: &str) {
    sqlx::query("UPDATE otp_codes SET consumed = TRUE WHERE phone = $1 AND NOT consumed")
        .bind(phone)
        .execute(pool)
        .await
        .expect("Failed to retire old codes");
    sqlx::query(
        "INSERT INTO otp_codes (phone, code_hash, expires_at)
         VALUES ($1, encode(sha256(convert_to($2, 'UTF8')), 'hex'), NOW() + INTERVAL '10 minutes')",
    )
    .bind(phone)
    .bind(code)
    .execute(pool)
    .await
    .expect("Failed to plant OTP");
}

/// POST the verify endpoint.
///
/// # Panics
///
/// Panics if the request cannot be sent.
pub async fn verify_otp(client: &Client, phone: &str, otp: &str) -> Response {
    client
        .post(format!("{}/api/auth/verify-otp", base_url()))
        .json(&json!({ "phone": phone, "otp": otp, "name": "Integration Test" }))
        .send()
        .await
        .expect("Failed to call verify-otp")
}

/// A signed-in buyer: a client holding the session cookie plus the bearer token.
pub struct Buyer {
    pub client: Client,
    pub token: String,
    pub phone: String,
}

impl Buyer {
    /// Sign a brand-new buyer in.
    ///
    /// # Panics
    ///
    /// Panics if sign-in does not succeed.
    pub async fn sign_in(pool: &PgPool) -> Self {
        let phone = unique_phone();
        plant_otp(pool, &phone, TEST_OTP).await;

        let client = client();
        let resp = verify_otp(&client, &phone, TEST_OTP).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.expect("Failed to parse sign-in");
        let token = body["token"]
            .as_str()
            .expect("sign-in returned no token")
            .to_string();

        Self {
            client,
            token,
            phone,
        }
    }

    /// Absolute URL for an API path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", base_url())
    }
}

/// The first active product in the catalog as `(id, minOrderQuantity)`.
///
/// # Panics
///
/// Panics if the catalog is empty.
pub async fn first_product(client: &Client) -> (i64, i64) {
    let body: Value = client
        .get(format!("{}/api/products?limit=1", base_url()))
        .send()
        .await
        .expect("Failed to list products")
        .json()
        .await
        .expect("Failed to parse products");
    let product = &body["items"][0];
    let id = product["id"]
        .as_i64()
        .expect("catalog is empty; run `wh-cli seed`");
    let moq = product["minOrderQuantity"].as_i64().unwrap_or(1);
    (id, moq)
}

//! Smoke checks against a live deployment.
//!
//! `smoke api` walks the public endpoints of a running storefront and, when
//! a phone and OTP are given, signs in and exercises the cart. `smoke
//! delhivery` calls the courier directly with the configured token. Every
//! step runs even after an earlier one fails (steps that need a sign-in or
//! a product are skipped without one); a pass/fail summary is logged at the
//! end and any failure makes the command exit non-zero.

use std::fmt::Display;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{error, info, warn};

use wholesale_storefront::config::DelhiveryConfig;
use wholesale_storefront::delhivery::{DelhiveryClient, TransportMode};

/// Pincode looked up by `smoke api`.
const SMOKE_PINCODE: &str = "110001";

/// A failed smoke step, or the run as a whole.
#[derive(Debug, Error)]
pub enum SmokeError {
    #[error("{step}: request failed: {source}")]
    Request {
        step: &'static str,
        source: reqwest::Error,
    },

    #[error("{step}: expected {expected}, got {actual}: {body}")]
    Status {
        step: &'static str,
        expected: StatusCode,
        actual: StatusCode,
        body: String,
    },

    #[error("{step}: {message}")]
    Check { step: &'static str, message: String },

    #[error("{failed} of {total} smoke steps failed")]
    Failed { failed: usize, total: usize },
}

/// Pass/fail record of every step that ran.
#[derive(Debug, Default)]
struct Report {
    steps: Vec<(&'static str, Option<String>)>,
}

impl Report {
    /// Note a step's outcome and hand back its value when it passed.
    fn record<T, E: Display>(&mut self, step: &'static str, result: Result<T, E>) -> Option<T> {
        match result {
            Ok(value) => {
                info!(step, "ok");
                self.steps.push((step, None));
                Some(value)
            }
            Err(e) => {
                let message = e.to_string();
                error!(step, error = %message, "failed");
                self.steps.push((step, Some(message)));
                None
            }
        }
    }

    /// Log the summary; an error if any step failed.
    fn finish(&self) -> Result<(), SmokeError> {
        let total = self.steps.len();
        let failures: Vec<_> = self
            .steps
            .iter()
            .filter_map(|(step, failure)| failure.as_deref().map(|f| (*step, f)))
            .collect();

        for (step, failure) in &failures {
            error!(step, failure, "FAIL");
        }
        info!(passed = total - failures.len(), failed = failures.len(), "Smoke summary");

        if failures.is_empty() {
            Ok(())
        } else {
            Err(SmokeError::Failed {
                failed: failures.len(),
                total,
            })
        }
    }
}

struct Smoke {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl Smoke {
    fn new(base_url: &str) -> Result<Self, SmokeError> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|source| SmokeError::Request {
                step: "client",
                source,
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{path}", self.base_url));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

/// Send a request and require a 200 with a JSON body.
async fn expect_ok(step: &'static str, builder: RequestBuilder) -> Result<Value, SmokeError> {
    let response = builder
        .send()
        .await
        .map_err(|source| SmokeError::Request { step, source })?;
    let status = response.status();
    if status != StatusCode::OK {
        let body = response.text().await.unwrap_or_default();
        return Err(SmokeError::Status {
            step,
            expected: StatusCode::OK,
            actual: status,
            body,
        });
    }
    response
        .json::<Value>()
        .await
        .map_err(|source| SmokeError::Request { step, source })
}

/// Run one HTTP step and record it.
async fn call(report: &mut Report, step: &'static str, builder: RequestBuilder) -> Option<Value> {
    let result = expect_ok(step, builder).await;
    report.record(step, result)
}

fn check(step: &'static str, ok: bool, message: impl FnOnce() -> String) -> Result<(), SmokeError> {
    if ok {
        Ok(())
    } else {
        Err(SmokeError::Check {
            step,
            message: message(),
        })
    }
}

/// Quantity of a product's plain (no variant) line in a cart body.
fn cart_quantity(cart: &Value, product_id: i64) -> Option<i64> {
    cart.get("items")?
        .as_array()?
        .iter()
        .find(|line| {
            line.get("productId").and_then(Value::as_i64) == Some(product_id)
                && line.get("variantIndex").is_none_or(Value::is_null)
        })
        .and_then(|line| line.get("quantity"))
        .and_then(Value::as_i64)
}

/// Walk the storefront API.
///
/// `login` is a `(phone, otp)` pair; the OTP must already have been
/// requested for that phone.
///
/// # Errors
///
/// Returns [`SmokeError::Failed`] after all steps ran if any of them failed.
pub async fn api(base_url: &str, login: Option<(String, String)>) -> Result<(), SmokeError> {
    let mut smoke = Smoke::new(base_url)?;
    let mut report = Report::default();
    info!(base_url = %smoke.base_url, "Running API smoke checks");

    call(&mut report, "health", smoke.request(Method::GET, "/health/ready")).await;

    let first = match call(
        &mut report,
        "list products",
        smoke.request(Method::GET, "/api/products?limit=1"),
    )
    .await
    {
        Some(products) => report.record(
            "catalog not empty",
            products.pointer("/items/0").cloned().ok_or_else(|| SmokeError::Check {
                step: "catalog not empty",
                message: "no products; run `wh-cli seed` first".to_string(),
            }),
        ),
        None => None,
    };

    call(
        &mut report,
        "category tree",
        smoke.request(Method::GET, "/api/categories/tree"),
    )
    .await;

    if let Some(pincode) = call(
        &mut report,
        "pincode",
        smoke.request(Method::GET, &format!("/api/delhivery/pincode/{SMOKE_PINCODE}")),
    )
    .await
    {
        info!(
            serviceable = pincode.get("serviceable").and_then(serde_json::Value::as_bool),
            "Pincode {SMOKE_PINCODE}"
        );
    }

    let Some((phone, otp)) = login else {
        info!("No --phone/--otp given; skipping signed-in checks");
        return report.finish();
    };

    if let Some(signed_in) = call(
        &mut report,
        "verify otp",
        smoke
            .request(Method::POST, "/api/auth/verify-otp")
            .json(&json!({ "phone": phone, "otp": otp })),
    )
    .await
    {
        smoke.token = signed_in
            .get("token")
            .and_then(Value::as_str)
            .map(ToString::to_string);
        report.record(
            "session token",
            check("session token", smoke.token.is_some(), || {
                "response carried no token".to_string()
            }),
        );
    }
    if smoke.token.is_none() {
        warn!("Not signed in; skipping signed-in checks");
        return report.finish();
    }

    call(&mut report, "me", smoke.request(Method::GET, "/api/auth/me")).await;

    if let Some(first) = first {
        let product_id = first.get("id").and_then(Value::as_i64).unwrap_or_default();
        let moq = first
            .get("minOrderQuantity")
            .and_then(Value::as_i64)
            .unwrap_or(1);

        call(&mut report, "clear cart", smoke.request(Method::DELETE, "/api/cart")).await;
        for step in ["add to cart", "add to cart again"] {
            call(
                &mut report,
                step,
                smoke
                    .request(Method::POST, "/api/cart")
                    .json(&json!({ "productId": product_id, "quantity": moq })),
            )
            .await;
        }

        if let Some(cart) = call(&mut report, "show cart", smoke.request(Method::GET, "/api/cart")).await {
            let quantity = cart_quantity(&cart, product_id);
            report.record(
                "cart quantity",
                check("cart quantity", quantity == Some(moq * 2), || {
                    format!("expected {}, got {quantity:?}", moq * 2)
                }),
            );
        }

        call(&mut report, "clear cart", smoke.request(Method::DELETE, "/api/cart")).await;
    } else {
        warn!("No product to work with; skipping cart checks");
    }

    call(&mut report, "logout", smoke.request(Method::POST, "/api/auth/logout")).await;

    report.finish()
}

/// Call Delhivery with the configured credentials.
///
/// # Errors
///
/// Returns an error if the token is missing, or after all calls ran if any
/// of them failed.
pub async fn delhivery(pincode: &str) -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let config = DelhiveryConfig::from_env()?;
    let client = DelhiveryClient::new(&config);
    let mut report = Report::default();
    info!(api_url = %config.api_url, "Running Delhivery smoke checks");

    if let Some(serviceability) = report.record("pincode", client.check_pincode(pincode).await) {
        info!(
            pincode,
            serviceable = serviceability.serviceable,
            cod = serviceability.is_cod,
            city = serviceability.city.as_deref().unwrap_or("-"),
            "Pincode lookup"
        );
    }

    match config.origin_pincode.as_deref() {
        Some(origin) => {
            let quote = client
                .expected_tat(origin, pincode, TransportMode::Surface)
                .await;
            if let Some(quote) = report.record("tat", quote) {
                info!(origin, tat_days = ?quote.tat_days, "TAT lookup");
            }
        }
        None => info!("DELHIVERY_ORIGIN_PINCODE not set; skipping TAT"),
    }

    if let Some(waybills) = report.record("waybill", client.fetch_waybills(1).await) {
        report.record(
            "waybill count",
            check("waybill count", !waybills.is_empty(), || {
                "no waybill returned".to_string()
            }),
        );
    }

    report.finish()?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_quantity_ignores_variant_lines() {
        let cart = json!({
            "items": [
                { "productId": 3, "variantIndex": 1, "quantity": 5 },
                { "productId": 3, "variantIndex": null, "quantity": 20 },
            ]
        });
        assert_eq!(cart_quantity(&cart, 3), Some(20));
        assert_eq!(cart_quantity(&cart, 4), None);
    }

    #[test]
    fn test_check_reports_step() {
        let err = check("cart", false, || "boom".to_string()).unwrap_err();
        assert_eq!(err.to_string(), "cart: boom");
    }

    #[test]
    fn test_report_keeps_going_after_a_failure() {
        let mut report = Report::default();
        assert_eq!(report.record("health", Ok::<_, SmokeError>(1)), Some(1));
        assert_eq!(
            report.record("cart", check("cart", false, || "boom".to_string())),
            None
        );
        assert_eq!(report.record("logout", Ok::<_, SmokeError>(())), Some(()));

        assert_eq!(report.steps.len(), 3);
        let err = report.finish().unwrap_err();
        assert_eq!(err.to_string(), "1 of 3 smoke steps failed");
    }

    #[test]
    fn test_report_passes_when_every_step_passed() {
        let mut report = Report::default();
        report.record("health", Ok::<_, SmokeError>(()));
        report.record("me", Ok::<_, SmokeError>(()));
        assert!(report.finish().is_ok());
    }
}

//! Wholesale storefront API.
//!
//! JSON backend for a B2B storefront: phone/OTP sign-in, catalog with tiered
//! pricing, cart, checkout with coupons and wallet credit, Razorpay payments,
//! Delhivery shipping and GST invoices.
//!
//! The binary in `main.rs` wires configuration, telemetry and the server;
//! [`app`] builds the router so tests can drive it in-process.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod delhivery;
pub mod error;
pub mod middleware;
pub mod models;
pub mod razorpay;
pub mod routes;
pub mod services;
pub mod state;

use axum::{
    Json, Router,
    extract::State,
    http::{Request, StatusCode, header::InvalidHeaderValue},
    routing::get,
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router with its middleware stack.
///
/// # Errors
///
/// Returns an error if the site origin cannot be used as a CORS header.
pub fn app(state: AppState) -> Result<Router, InvalidHeaderValue> {
    let session_layer = middleware::create_session_layer(state.pool(), state.config());
    let cors = middleware::cors_layer(&state.site_origin())?;

    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
        tracing::info_span!(
            "request",
            method = %request.method(),
            path = %request.uri().path(),
            request_id = tracing::field::Empty,
        )
    });

    Ok(Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes())
        .layer(session_layer)
        .layer(cors)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(trace)
        .with_state(state))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity. Returns 503 if the database is not
/// reachable.
async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "ok", "database": "ok" })),
        ),
        Err(e) => {
            tracing::error!("Readiness check failed: {e}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "status": "unavailable", "database": "error" })),
            )
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use sqlx::PgPool;
    use tower::ServiceExt;

    use super::*;

    fn test_app() -> Router {
        let pool = PgPool::connect_lazy("postgres://localhost/wholesale_test").unwrap();
        let state = AppState::new(config::tests::test_config(), pool).unwrap();
        app(state).unwrap()
    }

    #[tokio::test]
    async fn test_health_is_ok_without_database() {
        let response = test_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/api/nope")
                    .header("x-forwarded-for", "203.0.113.9")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

//! CORS for the browser storefront.
//!
//! The site is served from its own origin and calls this API with the
//! session cookie, so credentials are allowed for that one origin only.

use std::time::Duration;

use axum::http::{HeaderValue, Method, header};
use tower_http::cors::CorsLayer;

/// Preflight cache lifetime.
const MAX_AGE: Duration = Duration::from_secs(60 * 60);

/// Build the CORS layer for `origin` (scheme, host and port, no path).
///
/// # Errors
///
/// Returns an error if `origin` is not a valid header value.
pub fn cors_layer(origin: &str) -> Result<CorsLayer, header::InvalidHeaderValue> {
    let origin = HeaderValue::from_str(origin)?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .expose_headers([header::HeaderName::from_static(
            super::request_id::REQUEST_ID_HEADER,
        )])
        .max_age(MAX_AGE))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, body::Body, http::Request, routing::get};
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn test_allows_site_origin_with_credentials() {
        let app = Router::new()
            .route("/api/products", get(|| async { "ok" }))
            .layer(cors_layer("https://shop.example.in").unwrap());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/products")
                    .header(header::ORIGIN, "https://shop.example.in")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://shop.example.in"
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
            "true"
        );
    }

    #[tokio::test]
    async fn test_other_origins_get_no_allow_header() {
        let app = Router::new()
            .route("/api/products", get(|| async { "ok" }))
            .layer(cors_layer("https://shop.example.in").unwrap());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/products")
                    .header(header::ORIGIN, "https://evil.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .is_none()
        );
    }
}

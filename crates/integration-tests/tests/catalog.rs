//! Public catalog and courier lookups.

use reqwest::StatusCode;
use serde_json::Value;
use wholesale_integration_tests::{base_url, client};

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_health_endpoints() {
    let client = client();
    for path in ["/health", "/health/ready"] {
        let resp = client
            .get(format!("{}{path}", base_url()))
            .send()
            .await
            .expect("Failed to call health");
        assert_eq!(resp.status(), StatusCode::OK, "{path}");
    }
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_product_listing_is_paginated() {
    let body: Value = client()
        .get(format!("{}/api/products?page=1&limit=2", base_url()))
        .send()
        .await
        .expect("Failed to list products")
        .json()
        .await
        .expect("Failed to parse products");

    assert_eq!(body["page"], 1);
    assert_eq!(body["limit"], 2);
    assert!(body["items"].as_array().is_some_and(|items| items.len() <= 2));
    assert!(body["totalPages"].is_number());
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_unknown_product_is_404() {
    let resp = client()
        .get(format!("{}/api/products/999999999", base_url()))
        .send()
        .await
        .expect("Failed to fetch product");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_pincode_check() {
    let resp = client()
        .get(format!("{}/api/delhivery/pincode/110001", base_url()))
        .send()
        .await
        .expect("Failed to check pincode");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("Failed to parse pincode");
    assert_eq!(body["pincode"], "110001");
    assert!(body["serviceable"].is_boolean());
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_malformed_pincode_is_400() {
    let resp = client()
        .get(format!("{}/api/delhivery/pincode/12ab", base_url()))
        .send()
        .await
        .expect("Failed to check pincode");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

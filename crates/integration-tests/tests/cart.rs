//! Cart behavior against a live server.

use reqwest::StatusCode;
use serde_json::{Value, json};
use wholesale_integration_tests::{Buyer, first_product, pool};

fn plain_line(cart: &Value, product_id: i64) -> Option<&Value> {
    cart["items"].as_array()?.iter().find(|line| {
        line["productId"].as_i64() == Some(product_id) && line["variantIndex"].is_null()
    })
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_adding_same_product_twice_increments_quantity() {
    let pool = pool().await;
    let buyer = Buyer::sign_in(&pool).await;
    let (product_id, moq) = first_product(&buyer.client).await;

    for _ in 0..2 {
        let resp = buyer
            .client
            .post(buyer.url("/api/cart"))
            .json(&json!({ "productId": product_id, "quantity": moq }))
            .send()
            .await
            .expect("Failed to add to cart");
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let cart: Value = buyer
        .client
        .get(buyer.url("/api/cart"))
        .send()
        .await
        .expect("Failed to load cart")
        .json()
        .await
        .expect("Failed to parse cart");

    let line = plain_line(&cart, product_id).expect("line missing from cart");
    assert_eq!(line["quantity"].as_i64(), Some(moq * 2));
    assert_eq!(cart["items"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_quantity_below_moq_is_rejected() {
    let pool = pool().await;
    let buyer = Buyer::sign_in(&pool).await;
    let (product_id, moq) = first_product(&buyer.client).await;
    if moq <= 1 {
        return;
    }

    let resp = buyer
        .client
        .post(buyer.url("/api/cart"))
        .json(&json!({ "productId": product_id, "quantity": moq - 1 }))
        .send()
        .await
        .expect("Failed to add to cart");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_update_to_zero_removes_line() {
    let pool = pool().await;
    let buyer = Buyer::sign_in(&pool).await;
    let (product_id, moq) = first_product(&buyer.client).await;

    buyer
        .client
        .post(buyer.url("/api/cart"))
        .json(&json!({ "productId": product_id, "quantity": moq }))
        .send()
        .await
        .expect("Failed to add to cart");

    let cart: Value = buyer
        .client
        .put(buyer.url(&format!("/api/cart/{product_id}")))
        .json(&json!({ "quantity": 0 }))
        .send()
        .await
        .expect("Failed to update cart")
        .json()
        .await
        .expect("Failed to parse cart");
    assert!(plain_line(&cart, product_id).is_none());
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_empty_cart_cannot_check_out() {
    let pool = pool().await;
    let buyer = Buyer::sign_in(&pool).await;

    let resp = buyer
        .client
        .post(buyer.url("/api/orders"))
        .json(&json!({ "addressId": 1, "paymentMethod": "cod" }))
        .send()
        .await
        .expect("Failed to place order");
    assert!(resp.status().is_client_error());
}

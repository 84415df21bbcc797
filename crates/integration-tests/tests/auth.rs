//! OTP sign-in, session and token handling.
//!
//! Requires a running storefront and access to its database.

use reqwest::StatusCode;
use serde_json::Value;
use wholesale_integration_tests::{
    Buyer, TEST_OTP, base_url, client, plant_otp, pool, unique_phone, verify_otp,
};

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_verify_otp_sets_session_cookie() {
    let pool = pool().await;
    let buyer = Buyer::sign_in(&pool).await;

    // No Authorization header: the cookie jar alone must be enough.
    let resp = buyer
        .client
        .get(buyer.url("/api/auth/me"))
        .send()
        .await
        .expect("Failed to call /me");
    assert_eq!(resp.status(), StatusCode::OK);

    let me: Value = resp.json().await.expect("Failed to parse /me");
    assert_eq!(me["phone"], buyer.phone.as_str());
    assert_eq!(me["role"], "customer");
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_bearer_token_works_without_cookies() {
    let pool = pool().await;
    let buyer = Buyer::sign_in(&pool).await;

    let resp = client()
        .get(format!("{}/api/auth/me", base_url()))
        .bearer_auth(&buyer.token)
        .send()
        .await
        .expect("Failed to call /me");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_wrong_otp_is_rejected() {
    let pool = pool().await;
    let phone = unique_phone();
    plant_otp(&pool, &phone, TEST_OTP).await;

    let resp = verify_otp(&client(), &phone, "000000").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: Value = resp.json().await.expect("Failed to parse error");
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_otp_cannot_be_reused() {
    let pool = pool().await;
    let buyer = Buyer::sign_in(&pool).await;

    let resp = verify_otp(&client(), &buyer.phone, TEST_OTP).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_parallel_wrong_guesses_stop_at_attempt_limit() {
    let pool = pool().await;
    let phone = unique_phone();
    plant_otp(&pool, &phone, TEST_OTP).await;
    sqlx::query("UPDATE otp_codes SET attempts = 4 WHERE phone = $1 AND NOT consumed")
        .bind(&phone)
        .execute(&pool)
        .await
        .expect("Failed to preset attempts");

    // One guess left; fire several at once.
    let mut guesses = tokio::task::JoinSet::new();
    for _ in 0..4 {
        let phone = phone.clone();
        guesses.spawn(async move { verify_otp(&client(), &phone, "000000").await.status() });
    }
    while let Some(status) = guesses.join_next().await {
        assert_ne!(status.expect("guess task panicked"), StatusCode::OK);
    }

    let attempts: i32 = sqlx::query_scalar(
        "SELECT attempts FROM otp_codes WHERE phone = $1 AND NOT consumed",
    )
    .bind(&phone)
    .fetch_one(&pool)
    .await
    .expect("Failed to read attempts");
    assert!(attempts <= 5, "attempts went past the limit: {attempts}");

    // The code is burnt even though it is correct.
    let resp = verify_otp(&client(), &phone, TEST_OTP).await;
    assert_ne!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_logout_revokes_token() {
    let pool = pool().await;
    let buyer = Buyer::sign_in(&pool).await;

    let resp = client()
        .post(format!("{}/api/auth/logout", base_url()))
        .bearer_auth(&buyer.token)
        .send()
        .await
        .expect("Failed to log out");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client()
        .get(format!("{}/api/auth/me", base_url()))
        .bearer_auth(&buyer.token)
        .send()
        .await
        .expect("Failed to call /me");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_protected_route_requires_sign_in() {
    let resp = client()
        .get(format!("{}/api/cart", base_url()))
        .send()
        .await
        .expect("Failed to call /cart");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! # Auth
//! POST /api/auth/request-otp          - Send a sign-in code (rate limited)
//! POST /api/auth/verify-otp           - Trade the code for a token + session
//! POST /api/auth/logout               - Clear session, revoke token
//! GET  /api/auth/me                   - Profile
//! PUT  /api/auth/me                   - Update profile
//!
//! # Catalog
//! GET  /api/products                  - Listing (category, search, sort, paging)
//! POST /api/products                  - Create (admin)
//! GET  /api/products/{id}             - Detail by ID or slug
//! PUT  /api/products/{id}             - Update (admin)
//! DELETE /api/products/{id}           - Deactivate (admin)
//! GET  /api/products/{id}/reviews     - Reviews
//! POST /api/products/{id}/reviews     - Write or replace own review
//! GET  /api/categories                - Flat list
//! POST /api/categories                - Create (admin)
//! GET  /api/categories/tree           - Nested tree
//! GET  /api/categories/{id}           - Detail by ID or slug
//!
//! # Cart
//! GET    /api/cart                    - Priced cart
//! POST   /api/cart                    - Add (increments existing line)
//! DELETE /api/cart                    - Clear
//! PUT    /api/cart/{productId}        - Set quantity (0 removes)
//! DELETE /api/cart/{productId}        - Remove line(s)
//! POST   /api/cart/merge              - Merge a guest cart
//!
//! # Addresses, coupons, wallet
//! GET/POST   /api/addresses
//! PUT/DELETE /api/addresses/{id}
//! PUT        /api/addresses/{id}/default
//! POST       /api/coupons/validate
//! GET/POST   /api/coupons             - (admin)
//! GET        /api/wallet
//!
//! # Orders and payments
//! GET/POST /api/orders
//! GET      /api/orders/{id}
//! POST     /api/orders/{id}/cancel
//! GET      /api/orders/{id}/track
//! GET      /api/invoices/{orderId}    - HTML invoice
//! POST     /api/payments/order        - Create Razorpay order
//! POST     /api/payments/verify       - Verify checkout signature
//! POST     /api/payments/webhook      - Razorpay events
//!
//! # Delhivery
//! GET  /api/delhivery/pincode/{pin}
//! GET  /api/delhivery/tat
//! GET  /api/delhivery/track/{waybill}
//! ...  shipments, pickups, waybills, charges, warehouses, labels (admin)
//!
//! # Admin
//! GET  /api/admin/orders
//! GET  /api/admin/orders/{id}
//! PUT  /api/admin/orders/{id}/status
//! POST /api/admin/wallet/{userId}/credit
//! ```

pub mod addresses;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod coupons;
pub mod delhivery;
pub mod invoices;
pub mod orders;
pub mod payments;
pub mod products;
pub mod wallet;

use axum::{
    Router,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};

use crate::db::products::MAX_PAGE_SIZE;
use crate::middleware::{api_rate_limiter, otp_rate_limiter};
use crate::state::AppState;

/// One page of a listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, total: i64, page: i64, limit: i64) -> Self {
        let total_pages = if limit > 0 { (total + limit - 1) / limit } else { 0 };
        Self {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }
}

/// `?page=&limit=` for listings.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    /// `(page, limit)` clamped to page ≥ 1 and `1..=MAX_PAGE_SIZE`.
    #[must_use]
    pub fn normalized(self) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(20).clamp(1, MAX_PAGE_SIZE);
        (page, limit)
    }
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/request-otp", post(auth::request_otp))
        .route("/verify-otp", post(auth::verify_otp))
        // Only the routes above are limited
        .route_layer(otp_rate_limiter())
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me).put(auth::update_me))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
        .route(
            "/{id}/reviews",
            get(products::reviews).post(products::upsert_review),
        )
}

/// Create the category routes router.
pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(categories::index).post(categories::create))
        .route("/tree", get(categories::tree))
        .route("/{id}", get(categories::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(cart::show).post(cart::add).delete(cart::clear),
        )
        .route("/merge", post(cart::merge))
        .route("/{product_id}", put(cart::update).delete(cart::remove))
}

/// Create the address routes router.
pub fn address_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(addresses::index).post(addresses::create))
        .route(
            "/{id}",
            put(addresses::update).delete(addresses::delete),
        )
        .route("/{id}/default", put(addresses::set_default))
}

/// Create the coupon routes router.
pub fn coupon_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(coupons::index).post(coupons::create))
        .route("/validate", post(coupons::validate))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index).post(orders::create))
        .route("/{id}", get(orders::show))
        .route("/{id}/cancel", post(orders::cancel))
        .route("/{id}/track", get(orders::track))
}

/// Create the payment routes router.
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/order", post(payments::create_order))
        .route("/verify", post(payments::verify))
        .route("/webhook", post(payments::webhook))
}

/// Create the Delhivery routes router.
pub fn delhivery_routes() -> Router<AppState> {
    Router::new()
        .route("/pincode/{pin}", get(delhivery::pincode))
        .route("/tat", get(delhivery::tat))
        .route("/track/{waybill}", get(delhivery::track))
        .route("/shipments", post(delhivery::create_shipment))
        .route("/shipments/{waybill}/cancel", post(delhivery::cancel_shipment))
        .route("/pickup-locations", get(delhivery::pickup_locations))
        .route("/pickup", post(delhivery::request_pickup))
        .route("/waybills", get(delhivery::waybills))
        .route("/charges", get(delhivery::charges))
        .route(
            "/warehouses",
            get(delhivery::warehouses).post(delhivery::create_warehouse),
        )
        .route(
            "/warehouses/{id}",
            put(delhivery::update_warehouse).delete(delhivery::delete_warehouse),
        )
        .route("/labels/{waybill}", get(delhivery::label))
        .route("/documents/{waybill}", get(delhivery::document))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(orders::admin_index))
        .route("/orders/{id}", get(orders::admin_show))
        .route("/orders/{id}/status", put(orders::admin_update_status))
        .route("/wallet/{user_id}/credit", post(wallet::credit))
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .nest("/auth", auth_routes())
        .nest("/products", product_routes())
        .nest("/categories", category_routes())
        .nest("/cart", cart_routes())
        .nest("/addresses", address_routes())
        .nest("/coupons", coupon_routes())
        .nest("/orders", order_routes())
        .route("/invoices/{order_id}", get(invoices::show))
        .nest("/payments", payment_routes())
        .nest("/delhivery", delhivery_routes())
        .route("/wallet", get(wallet::show))
        .nest("/admin", admin_routes())
        .layer(api_rate_limiter());

    Router::new().nest("/api", api)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_counts_partial_last_page() {
        let page = Page::new(vec![1, 2, 3], 41, 1, 20);
        assert_eq!(page.total_pages, 3);
        assert_eq!(Page::<i32>::new(vec![], 0, 1, 20).total_pages, 0);
    }

    #[test]
    fn test_page_query_clamps() {
        let q = PageQuery {
            page: Some(0),
            limit: Some(1000),
        };
        assert_eq!(q.normalized(), (1, MAX_PAGE_SIZE));
        assert_eq!(PageQuery::default().normalized(), (1, 20));
    }
}

//! Cart route handlers.
//!
//! Carts live in the database per user, so every cart route requires sign-in.
//! Guest carts kept by the client are folded in with `/api/cart/merge` after
//! sign-in. Every mutation answers with the freshly priced cart.

use std::collections::HashSet;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use wholesale_core::{ProductId, UserId};

use crate::db::{CartRepository, ProductRepository};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::{CartKey, CartSummary, Product};
use crate::services::pricing::{line_problem, price_cart};
use crate::state::AppState;

/// Add-to-cart body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItem {
    pub product_id: ProductId,
    #[serde(default)]
    pub variant_index: Option<usize>,
    pub quantity: i32,
}

/// Quantity update body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetQuantity {
    #[serde(default)]
    pub variant_index: Option<usize>,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantQuery {
    pub variant_index: Option<usize>,
}

/// Guest cart to merge.
#[derive(Debug, Deserialize)]
pub struct MergeCart {
    pub items: Vec<AddItem>,
}

/// Load and price a user's cart.
pub(crate) async fn load_cart(state: &AppState, user_id: UserId) -> Result<CartSummary> {
    let items = CartRepository::new(state.pool()).list(user_id).await?;
    let ids: Vec<ProductId> = items
        .iter()
        .map(|i| i.product_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let products = ProductRepository::new(state.pool()).get_many(&ids).await?;
    Ok(price_cart(&items, &products))
}

async fn active_product(state: &AppState, id: ProductId) -> Result<Product> {
    ProductRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
}

/// Reject a quantity the line could not be ordered at.
fn check_line(product: &Product, key: CartKey, quantity: i32) -> Result<()> {
    match line_problem(product, key.variant_index, quantity) {
        Some(problem) => Err(AppError::BadRequest(problem)),
        None => Ok(()),
    }
}

/// GET /api/cart
///
/// # Errors
///
/// Returns 500 if the database query fails.
#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartSummary>> {
    Ok(Json(load_cart(&state, user.id).await?))
}

/// POST /api/cart
///
/// Adding a product+variant already in the cart increases its quantity.
///
/// # Errors
///
/// Returns 400 when the resulting quantity is below the minimum order
/// quantity or above stock, 404 for an unknown product.
#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<AddItem>,
) -> Result<Json<CartSummary>> {
    if body.quantity <= 0 {
        return Err(AppError::BadRequest(
            "Quantity must be at least 1".to_string(),
        ));
    }

    let product = active_product(&state, body.product_id).await?;
    let key = CartKey::new(body.product_id, body.variant_index);
    let carts = CartRepository::new(state.pool());
    let existing = carts.get(user.id, key).await?.map_or(0, |item| item.quantity);
    check_line(&product, key, existing.saturating_add(body.quantity))?;

    carts.add(user.id, key, body.quantity).await?;
    add_breadcrumb("cart", "Added to cart", Some(&[("key", &key.to_string())]));

    Ok(Json(load_cart(&state, user.id).await?))
}

/// PUT /api/cart/{productId}
///
/// Quantity 0 removes the line.
///
/// # Errors
///
/// Returns 400 for an unorderable quantity, 404 if the line is not in the
/// cart.
#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
    Json(body): Json<SetQuantity>,
) -> Result<Json<CartSummary>> {
    let key = CartKey::new(product_id, body.variant_index);
    let carts = CartRepository::new(state.pool());

    if body.quantity <= 0 {
        carts.remove(user.id, key).await?;
    } else {
        let product = active_product(&state, product_id).await?;
        check_line(&product, key, body.quantity)?;
        carts.set_quantity(user.id, key, body.quantity).await?;
    }

    Ok(Json(load_cart(&state, user.id).await?))
}

/// DELETE /api/cart/{productId}?variantIndex=
///
/// Without `variantIndex` every line of the product is removed.
///
/// # Errors
///
/// Returns 500 if the database query fails.
#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
    Query(query): Query<VariantQuery>,
) -> Result<Json<CartSummary>> {
    let carts = CartRepository::new(state.pool());
    match query.variant_index {
        Some(index) => {
            carts
                .remove(user.id, CartKey::new(product_id, Some(index)))
                .await?;
        }
        None => {
            carts.remove_product(user.id, product_id).await?;
        }
    }

    Ok(Json(load_cart(&state, user.id).await?))
}

/// DELETE /api/cart
///
/// # Errors
///
/// Returns 500 if the database query fails.
#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn clear(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartSummary>> {
    CartRepository::new(state.pool()).clear(user.id).await?;
    Ok(Json(CartSummary::from_lines(Vec::new())))
}

/// POST /api/cart/merge
///
/// Sums guest quantities into the stored cart. Lines for unknown or
/// inactive products are dropped; stock and minimum quantities are reported
/// per line in the returned cart rather than rejected.
///
/// # Errors
///
/// Returns 500 if the database query fails.
#[instrument(skip(state, body), fields(user_id = %user.id, lines = body.items.len()))]
pub async fn merge(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<MergeCart>,
) -> Result<Json<CartSummary>> {
    let ids: Vec<ProductId> = body.items.iter().map(|i| i.product_id).collect();
    let products = ProductRepository::new(state.pool()).get_many(&ids).await?;
    let lines = mergeable_lines(&body.items, &products);

    if !lines.is_empty() {
        CartRepository::new(state.pool()).merge(user.id, &lines).await?;
    }
    tracing::info!(merged = lines.len(), "Guest cart merged");

    Ok(Json(load_cart(&state, user.id).await?))
}

/// Guest lines worth merging, with equal keys summed.
///
/// Lines for inactive products or variants the product does not have are
/// dropped.
fn mergeable_lines(items: &[AddItem], products: &[Product]) -> Vec<(CartKey, i32)> {
    let mut lines: Vec<(CartKey, i32)> = Vec::new();
    for item in items.iter().filter(|i| i.quantity > 0) {
        let known = products.iter().any(|p| {
            p.id == item.product_id
                && p.is_active
                && (item.variant_index.is_none() || p.variant(item.variant_index).is_some())
        });
        if !known {
            continue;
        }
        let key = CartKey::new(item.product_id, item.variant_index);
        match lines.iter_mut().find(|(k, _)| *k == key) {
            Some((_, quantity)) => *quantity = quantity.saturating_add(item.quantity),
            None => lines.push((key, item.quantity)),
        }
    }
    lines
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::pricing::tests::product;

    fn item(product_id: i64, variant_index: Option<usize>, quantity: i32) -> AddItem {
        AddItem {
            product_id: ProductId::new(product_id),
            variant_index,
            quantity,
        }
    }

    #[test]
    fn test_merge_sums_equal_keys_and_drops_unknown_products() {
        let products = vec![product()];
        let lines = mergeable_lines(
            &[
                item(3, Some(0), 10),
                item(3, Some(0), 5),
                item(3, None, 20),
                item(99, None, 10),
                item(3, Some(1), 0),
            ],
            &products,
        );

        assert_eq!(
            lines,
            vec![
                (CartKey::new(ProductId::new(3), Some(0)), 15),
                (CartKey::new(ProductId::new(3), None), 20),
            ]
        );
    }

    #[test]
    fn test_merge_drops_variants_the_product_lacks() {
        let products = vec![product()];
        let lines = mergeable_lines(
            &[
                item(3, Some(2), 10),
                item(3, Some(3_000_000_000), 10),
                item(3, Some(1), 10),
            ],
            &products,
        );

        assert_eq!(lines, vec![(CartKey::new(ProductId::new(3), Some(1)), 10)]);
    }

    #[test]
    fn test_check_line_rejects_below_minimum() {
        let product = product();
        let key = CartKey::new(product.id, None);
        let err = check_line(&product, key, 5).unwrap_err();
        assert_eq!(err.to_string(), "Bad request: Minimum order quantity is 10");
        assert!(check_line(&product, key, 10).is_ok());
    }
}

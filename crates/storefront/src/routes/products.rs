//! Product catalog and reviews.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use wholesale_core::ProductId;

use crate::db::products::{ProductFilter, ProductSort};
use crate::db::{ProductRepository, ReviewRepository};
use crate::error::{AppError, Result};
use crate::middleware::{OptionalAuth, RequireAdmin, RequireAuth};
use crate::models::{Product, ProductInput, RatingSummary, Review};
use crate::routes::Page;
use crate::state::AppState;

/// Listing query string.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(default)]
    pub sort: ProductSort,
}

/// A product with its review summary.
#[derive(Debug, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub rating: RatingSummary,
}

/// GET /api/products
///
/// # Errors
///
/// Returns 500 if the database query fails.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<Product>>> {
    let filter = ProductFilter {
        category: query.category,
        search: query.search,
        page: query.page.unwrap_or(1),
        limit: query.limit.unwrap_or(20),
        sort: query.sort,
    }
    .normalized();

    let (products, total) = ProductRepository::new(state.pool()).list(&filter).await?;
    Ok(Json(Page::new(products, total, filter.page, filter.limit)))
}

/// GET /api/products/{id_or_slug}
///
/// # Errors
///
/// Returns 404 for unknown or inactive products.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ProductDetail>> {
    let repo = ProductRepository::new(state.pool());
    let product = repo
        .get_active_by_id_or_slug(&key)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
    let rating = repo.rating_summary(product.id).await?;

    Ok(Json(ProductDetail { product, rating }))
}

/// POST /api/products (admin)
///
/// # Errors
///
/// Returns 400 for invalid input, 409 if the slug is taken.
#[instrument(skip(state, input), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<ProductInput>,
) -> Result<Json<Product>> {
    input.validate().map_err(AppError::BadRequest)?;
    let product = ProductRepository::new(state.pool()).create(&input).await?;
    tracing::info!(product_id = %product.id, slug = %product.slug, "Product created");
    Ok(Json(product))
}

/// PUT /api/products/{id} (admin)
///
/// # Errors
///
/// Returns 400 for invalid input, 404 for an unknown product.
#[instrument(skip(state, input), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(input): Json<ProductInput>,
) -> Result<Json<Product>> {
    input.validate().map_err(AppError::BadRequest)?;
    let product = ProductRepository::new(state.pool()).update(id, &input).await?;
    Ok(Json(product))
}

/// DELETE /api/products/{id} (admin)
///
/// Products are deactivated rather than deleted; past orders keep their
/// snapshots either way.
///
/// # Errors
///
/// Returns 404 for an unknown product.
#[instrument(skip(state), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Json<serde_json::Value>> {
    ProductRepository::new(state.pool()).deactivate(id).await?;
    tracing::info!(product_id = %id, "Product deactivated");
    Ok(Json(serde_json::json!({ "success": true })))
}

// =============================================================================
// Reviews
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ReviewInput {
    pub rating: i16,
    pub title: Option<String>,
    pub comment: Option<String>,
}

/// Reviews plus, for a signed-in caller, their own review.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewList {
    pub summary: RatingSummary,
    pub reviews: Vec<Review>,
    pub my_review: Option<Review>,
}

/// GET /api/products/{id}/reviews
///
/// # Errors
///
/// Returns 500 if the database query fails.
pub async fn reviews(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<ProductId>,
) -> Result<Json<ReviewList>> {
    let reviews = ReviewRepository::new(state.pool()).list_for_product(id).await?;
    let summary = ProductRepository::new(state.pool()).rating_summary(id).await?;
    let my_review = user.and_then(|u| reviews.iter().find(|r| r.user_id == u.id).cloned());

    Ok(Json(ReviewList {
        summary,
        reviews,
        my_review,
    }))
}

/// POST /api/products/{id}/reviews
///
/// One review per buyer and product; posting again replaces it.
///
/// # Errors
///
/// Returns 400 for a rating outside 1-5, 404 for an unknown product.
#[instrument(skip(state, input), fields(user_id = %user.id))]
pub async fn upsert_review(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ProductId>,
    Json(input): Json<ReviewInput>,
) -> Result<Json<Review>> {
    if !(1..=5).contains(&input.rating) {
        return Err(AppError::BadRequest(
            "Rating must be between 1 and 5".to_string(),
        ));
    }

    ProductRepository::new(state.pool())
        .get_active_by_id_or_slug(&id.to_string())
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

    let title = input.title.as_deref().map(str::trim).filter(|t| !t.is_empty());
    let comment = input.comment.as_deref().map(str::trim).filter(|c| !c.is_empty());
    let review = ReviewRepository::new(state.pool())
        .upsert(user.id, id, input.rating, title, comment)
        .await?;

    Ok(Json(review))
}

//! Category listing and admin creation.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use wholesale_core::CategoryId;

use crate::db::categories::NewCategory;
use crate::db::{CategoryRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::catalog::slugify;
use crate::models::{Category, CategoryNode};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<CategoryId>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

/// GET /api/categories
///
/// # Errors
///
/// Returns 500 if the database query fails.
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = CategoryRepository::new(state.pool()).list_active().await?;
    Ok(Json(categories))
}

/// GET /api/categories/tree
///
/// # Errors
///
/// Returns 500 if the database query fails.
pub async fn tree(State(state): State<AppState>) -> Result<Json<Vec<CategoryNode>>> {
    let categories = CategoryRepository::new(state.pool()).list_active().await?;
    Ok(Json(CategoryNode::build_tree(categories)))
}

/// GET /api/categories/{id_or_slug}
///
/// # Errors
///
/// Returns 404 for an unknown category.
pub async fn show(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Category>> {
    CategoryRepository::new(state.pool())
        .get_by_id_or_slug(&key)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Category".to_string()))
}

/// POST /api/categories (admin)
///
/// # Errors
///
/// Returns 400 for a missing name or unknown parent, 409 if the slug is taken.
#[tracing::instrument(skip(state, input), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<CategoryInput>,
) -> Result<Json<Category>> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("name is required".to_string()));
    }
    let slug = slugify(input.slug.as_deref().unwrap_or(name));
    if slug.is_empty() {
        return Err(AppError::BadRequest(
            "slug needs at least one letter or digit".to_string(),
        ));
    }

    let category = CategoryRepository::new(state.pool())
        .create(&NewCategory {
            name,
            slug: &slug,
            description: input.description.as_deref(),
            parent_id: input.parent_id,
            image_url: input.image_url.as_deref(),
            sort_order: input.sort_order,
        })
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => {
                AppError::BadRequest("Parent category not found".to_string())
            }
            other => other.into(),
        })?;

    tracing::info!(category_id = %category.id, level = category.level, "Category created");
    Ok(Json(category))
}

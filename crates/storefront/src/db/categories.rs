//! Category repository.

use sqlx::PgPool;

use wholesale_core::CategoryId;

use super::RepositoryError;
use crate::models::Category;

const CATEGORY_COLUMNS: &str = "id, name, slug, description, parent_id, level, image_url, \
                                sort_order, is_active, created_at";

/// New category fields. `level` is derived from the parent.
#[derive(Debug, Clone)]
pub struct NewCategory<'a> {
    pub name: &'a str,
    pub slug: &'a str,
    pub description: Option<&'a str>,
    pub parent_id: Option<CategoryId>,
    pub image_url: Option<&'a str>,
    pub sort_order: i32,
}

pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All active categories, ordered by level then sort order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories
             WHERE is_active
             ORDER BY level, sort_order, name"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(categories)
    }

    /// Find an active category by numeric ID or slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id_or_slug(&self, key: &str) -> Result<Option<Category>, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories
             WHERE is_active AND (id::text = $1 OR slug = $1)
             ORDER BY (id::text = $1) DESC
             LIMIT 1"
        ))
        .bind(key.trim())
        .fetch_optional(self.pool)
        .await?;
        Ok(category)
    }

    /// Create a category one level below its parent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the parent does not exist.
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, new: &NewCategory<'_>) -> Result<Category, RepositoryError> {
        let level = match new.parent_id {
            Some(parent) => {
                let parent_level: Option<i32> =
                    sqlx::query_scalar("SELECT level FROM categories WHERE id = $1")
                        .bind(parent)
                        .fetch_optional(self.pool)
                        .await?;
                parent_level.ok_or(RepositoryError::NotFound)? + 1
            }
            None => 0,
        };

        sqlx::query_as::<_, Category>(&format!(
            "INSERT INTO categories (name, slug, description, parent_id, level, image_url, sort_order)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(new.name)
        .bind(new.slug)
        .bind(new.description)
        .bind(new.parent_id)
        .bind(level)
        .bind(new.image_url)
        .bind(new.sort_order)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique(e, "category slug already exists"))
    }
}

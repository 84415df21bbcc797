//! Product repository.

use serde::Deserialize;
use sqlx::PgPool;
use sqlx::types::Json;

use wholesale_core::ProductId;

use super::RepositoryError;
use crate::models::{Product, ProductInput, RatingSummary};

const PRODUCT_COLUMNS: &str = "id, name, slug, description, category_id, price, mrp, \
                               min_order_quantity, stock, images, variants, price_tiers, \
                               weight_grams, hsn_code, gst_rate, is_active, created_at, updated_at";

/// Largest page size the listing accepts.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Listing sort order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

impl ProductSort {
    const fn order_by(self) -> &'static str {
        match self {
            Self::Newest => "p.created_at DESC, p.id DESC",
            Self::PriceAsc => "p.price ASC, p.id",
            Self::PriceDesc => "p.price DESC, p.id",
            Self::Name => "p.name ASC, p.id",
        }
    }
}

/// Listing filter. `category` is an ID or slug and matches subcategories too.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub search: Option<String>,
    pub page: i64,
    pub limit: i64,
    pub sort: ProductSort,
}

impl ProductFilter {
    /// Clamp paging to `1..` pages of `1..=MAX_PAGE_SIZE` items.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.page = self.page.max(1);
        self.limit = if self.limit <= 0 { 20 } else { self.limit.min(MAX_PAGE_SIZE) };
        self.category = self.category.filter(|c| !c.trim().is_empty());
        self.search = self.search.filter(|s| !s.trim().is_empty());
        self
    }

    const fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

/// Escape `LIKE` metacharacters in user input.
fn like_pattern(search: &str) -> String {
    let escaped = search
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Shared `WHERE` for listing and counting. `$1` category, `$2` pattern.
const LISTING_SCOPE: &str = "
    WITH RECURSIVE scope AS (
        SELECT id FROM categories
        WHERE $1::text IS NOT NULL AND (id::text = $1 OR slug = $1)
        UNION ALL
        SELECT c.id FROM categories c JOIN scope s ON c.parent_id = s.id
    )
    SELECT {cols} FROM products p
    WHERE p.is_active
      AND ($1::text IS NULL OR p.category_id IN (SELECT id FROM scope))
      AND ($2::text IS NULL OR p.name ILIKE $2 OR p.description ILIKE $2)";

pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of active products plus the total match count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &ProductFilter) -> Result<(Vec<Product>, i64), RepositoryError> {
        let category = filter.category.as_deref().map(str::trim);
        let pattern = filter.search.as_deref().map(like_pattern);
        let columns = PRODUCT_COLUMNS
            .split(", ")
            .map(|c| format!("p.{}", c.trim()))
            .collect::<Vec<_>>()
            .join(", ");

        let list_sql = format!(
            "{} ORDER BY {} LIMIT $3 OFFSET $4",
            LISTING_SCOPE.replace("{cols}", &columns),
            filter.sort.order_by()
        );
        let products = sqlx::query_as::<_, Product>(&list_sql)
            .bind(category)
            .bind(pattern.as_deref())
            .bind(filter.limit)
            .bind(filter.offset())
            .fetch_all(self.pool)
            .await?;

        let count_sql = LISTING_SCOPE.replace("{cols}", "COUNT(*)");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(category)
            .bind(pattern.as_deref())
            .fetch_one(self.pool)
            .await?;

        Ok((products, total))
    }

    /// Get a product by ID, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(product)
    }

    /// Find an active product by numeric ID or slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active_by_id_or_slug(
        &self,
        key: &str,
    ) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE is_active AND (id::text = $1 OR slug = $1)
             ORDER BY (id::text = $1) DESC
             LIMIT 1"
        ))
        .bind(key.trim())
        .fetch_optional(self.pool)
        .await?;
        Ok(product)
    }

    /// Fetch several products at once (for cart resolution).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let raw: Vec<i64> = ids.iter().map(ProductId::get).collect();
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"
        ))
        .bind(raw)
        .fetch_all(self.pool)
        .await?;
        Ok(products)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, input: &ProductInput) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO products (name, slug, description, category_id, price, mrp,
                                   min_order_quantity, stock, images, variants, price_tiers,
                                   weight_grams, hsn_code, gst_rate, is_active)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(input.name.trim())
        .bind(input.slug())
        .bind(input.description.as_deref())
        .bind(input.category_id)
        .bind(input.price)
        .bind(input.mrp)
        .bind(input.min_order_quantity)
        .bind(input.stock)
        .bind(&input.images)
        .bind(Json(&input.variants))
        .bind(Json(&input.price_tiers))
        .bind(input.weight_grams)
        .bind(input.hsn_code.as_deref())
        .bind(input.gst_rate)
        .bind(input.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique(e, "product slug already exists"))
    }

    /// Replace a product's fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn update(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            "UPDATE products SET
                name = $2, slug = $3, description = $4, category_id = $5, price = $6, mrp = $7,
                min_order_quantity = $8, stock = $9, images = $10, variants = $11,
                price_tiers = $12, weight_grams = $13, hsn_code = $14, gst_rate = $15,
                is_active = $16, updated_at = NOW()
             WHERE id = $1
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(input.name.trim())
        .bind(input.slug())
        .bind(input.description.as_deref())
        .bind(input.category_id)
        .bind(input.price)
        .bind(input.mrp)
        .bind(input.min_order_quantity)
        .bind(input.stock)
        .bind(&input.images)
        .bind(Json(&input.variants))
        .bind(Json(&input.price_tiers))
        .bind(input.weight_grams)
        .bind(input.hsn_code.as_deref())
        .bind(input.gst_rate)
        .bind(input.is_active)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::unique(e, "product slug already exists"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Soft delete: hide the product from the catalog.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn deactivate(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE products SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn rating_summary(&self, id: ProductId) -> Result<RatingSummary, RepositoryError> {
        let summary = sqlx::query_as::<_, RatingSummary>(
            "SELECT AVG(rating)::float8 AS average, COUNT(*) AS count
             FROM reviews WHERE product_id = $1",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_normalization() {
        let filter = ProductFilter {
            page: 0,
            limit: 500,
            search: Some("  ".to_string()),
            ..ProductFilter::default()
        }
        .normalized();

        assert_eq!(filter.page, 1);
        assert_eq!(filter.limit, MAX_PAGE_SIZE);
        assert!(filter.search.is_none());
        assert_eq!(filter.offset(), 0);
    }

    #[test]
    fn test_default_limit() {
        let filter = ProductFilter {
            page: 3,
            ..ProductFilter::default()
        }
        .normalized();
        assert_eq!(filter.limit, 20);
        assert_eq!(filter.offset(), 40);
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" 100% cotton_ "), "%100\\% cotton\\_%");
    }
}

//! Product review repository.

use sqlx::PgPool;

use wholesale_core::{ProductId, UserId};

use super::RepositoryError;
use crate::models::Review;

pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Reviews for a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Review>, RepositoryError> {
        let reviews = sqlx::query_as::<_, Review>(
            "SELECT r.id, r.user_id, r.product_id, COALESCE(u.business_name, u.name) AS author,
                    r.rating, r.title, r.comment, r.created_at, r.updated_at
             FROM reviews r
             JOIN users u ON u.id = r.user_id
             WHERE r.product_id = $1
             ORDER BY r.updated_at DESC",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;
        Ok(reviews)
    }

    /// Create the user's review of a product, or replace their earlier one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(
        &self,
        user_id: UserId,
        product_id: ProductId,
        rating: i16,
        title: Option<&str>,
        comment: Option<&str>,
    ) -> Result<Review, RepositoryError> {
        let review = sqlx::query_as::<_, Review>(
            "WITH saved AS (
                INSERT INTO reviews (user_id, product_id, rating, title, comment)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (user_id, product_id) DO UPDATE
                   SET rating = EXCLUDED.rating,
                       title = EXCLUDED.title,
                       comment = EXCLUDED.comment,
                       updated_at = NOW()
                RETURNING *
             )
             SELECT s.id, s.user_id, s.product_id, COALESCE(u.business_name, u.name) AS author,
                    s.rating, s.title, s.comment, s.created_at, s.updated_at
             FROM saved s JOIN users u ON u.id = s.user_id",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(rating)
        .bind(title)
        .bind(comment)
        .fetch_one(self.pool)
        .await?;
        Ok(review)
    }
}

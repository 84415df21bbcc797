//! Cart repository.
//!
//! Lines are unique per `(user, product, variant)`; adding an existing line
//! increments its quantity instead of inserting a duplicate.

use sqlx::PgPool;

use wholesale_core::{ProductId, UserId};

use super::RepositoryError;
use crate::models::cart::{CartItem, CartKey, variant_to_db};

const CART_COLUMNS: &str =
    "id, user_id, product_id, variant_index, quantity, created_at, updated_at";

pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        let items = sqlx::query_as::<_, CartItem>(&format!(
            "SELECT {CART_COLUMNS} FROM cart_items WHERE user_id = $1 ORDER BY created_at, id"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(items)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        user_id: UserId,
        key: CartKey,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let item = sqlx::query_as::<_, CartItem>(&format!(
            "SELECT {CART_COLUMNS} FROM cart_items
             WHERE user_id = $1 AND product_id = $2 AND variant_index = $3"
        ))
        .bind(user_id)
        .bind(key.product_id)
        .bind(variant_to_db(key.variant_index))
        .fetch_optional(self.pool)
        .await?;
        Ok(item)
    }

    /// Add `quantity` to a line, creating it if absent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn add(
        &self,
        user_id: UserId,
        key: CartKey,
        quantity: i32,
    ) -> Result<CartItem, RepositoryError> {
        let item = sqlx::query_as::<_, CartItem>(&format!(
            "INSERT INTO cart_items (user_id, product_id, variant_index, quantity)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (user_id, product_id, variant_index) DO UPDATE
                SET quantity = cart_items.quantity + EXCLUDED.quantity,
                    updated_at = NOW()
             RETURNING {CART_COLUMNS}"
        ))
        .bind(user_id)
        .bind(key.product_id)
        .bind(variant_to_db(key.variant_index))
        .bind(quantity)
        .fetch_one(self.pool)
        .await?;
        Ok(item)
    }

    /// Set a line's quantity, creating it if absent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_quantity(
        &self,
        user_id: UserId,
        key: CartKey,
        quantity: i32,
    ) -> Result<CartItem, RepositoryError> {
        let item = sqlx::query_as::<_, CartItem>(&format!(
            "INSERT INTO cart_items (user_id, product_id, variant_index, quantity)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (user_id, product_id, variant_index) DO UPDATE
                SET quantity = EXCLUDED.quantity,
                    updated_at = NOW()
             RETURNING {CART_COLUMNS}"
        ))
        .bind(user_id)
        .bind(key.product_id)
        .bind(variant_to_db(key.variant_index))
        .bind(quantity)
        .fetch_one(self.pool)
        .await?;
        Ok(item)
    }

    /// Remove one line. Returns whether a line was removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove(&self, user_id: UserId, key: CartKey) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2 AND variant_index = $3",
        )
        .bind(user_id)
        .bind(key.product_id)
        .bind(variant_to_db(key.variant_index))
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove every line for a product, whatever the variant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove_product(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Merge guest cart lines in one transaction, summing equal keys.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails.
    pub async fn merge(
        &self,
        user_id: UserId,
        lines: &[(CartKey, i32)],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        for (key, quantity) in lines {
            sqlx::query(
                "INSERT INTO cart_items (user_id, product_id, variant_index, quantity)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT (user_id, product_id, variant_index) DO UPDATE
                    SET quantity = cart_items.quantity + EXCLUDED.quantity,
                        updated_at = NOW()",
            )
            .bind(user_id)
            .bind(key.product_id)
            .bind(variant_to_db(key.variant_index))
            .bind(quantity)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

//! Coupon repository.

use sqlx::PgPool;

use super::RepositoryError;
use crate::models::{Coupon, CouponInput};

const COUPON_COLUMNS: &str = "id, code, description, discount_type, value, min_order_value, \
                              max_discount, usage_limit, used_count, valid_from, valid_until, \
                              is_active, created_at";

pub struct CouponRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CouponRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Look up a coupon by code, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_code(&self, code: &str) -> Result<Option<Coupon>, RepositoryError> {
        let coupon = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE code = UPPER($1)"
        ))
        .bind(code.trim())
        .fetch_optional(self.pool)
        .await?;
        Ok(coupon)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Coupon>, RepositoryError> {
        let coupons = sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(coupons)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, input: &CouponInput) -> Result<Coupon, RepositoryError> {
        sqlx::query_as::<_, Coupon>(&format!(
            "INSERT INTO coupons (code, description, discount_type, value, min_order_value,
                                  max_discount, usage_limit, valid_from, valid_until, is_active)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {COUPON_COLUMNS}"
        ))
        .bind(input.normalized_code())
        .bind(input.description.as_deref())
        .bind(input.discount_type)
        .bind(input.value)
        .bind(input.min_order_value)
        .bind(input.max_discount)
        .bind(input.usage_limit)
        .bind(input.valid_from)
        .bind(input.valid_until)
        .bind(input.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique(e, "coupon code already exists"))
    }
}

//! One-time sign-in codes.
//!
//! Only a SHA-256 hash of each code is stored.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use wholesale_core::Phone;

use super::RepositoryError;

/// A stored OTP challenge.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OtpRecord {
    pub id: i64,
    pub code_hash: String,
    pub expires_at: DateTime<Utc>,
}

pub struct OtpRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OtpRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a new code, invalidating earlier unconsumed codes for the phone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(
        &self,
        phone: &Phone,
        code_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE otp_codes SET consumed = TRUE WHERE phone = $1 AND NOT consumed")
            .bind(phone)
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO otp_codes (phone, code_hash, expires_at) VALUES ($1, $2, $3)")
            .bind(phone)
            .bind(code_hash)
            .bind(expires_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// The latest live (unconsumed, unexpired) code for a phone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest_active(&self, phone: &Phone) -> Result<Option<OtpRecord>, RepositoryError> {
        let record = sqlx::query_as::<_, OtpRecord>(
            "SELECT id, code_hash, expires_at FROM otp_codes
             WHERE phone = $1 AND NOT consumed AND expires_at > NOW()
             ORDER BY created_at DESC
             LIMIT 1",
        )
        .bind(phone)
        .fetch_optional(self.pool)
        .await?;
        Ok(record)
    }

    /// Spend one attempt on a code, unless it already used `max`.
    ///
    /// The check and the increment are one statement, so concurrent guesses
    /// cannot share an attempt. Returns the new count, or `None` when the
    /// code is locked.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn claim_attempt(&self, id: i64, max: i32) -> Result<Option<i32>, RepositoryError> {
        let attempts = sqlx::query_scalar::<_, i32>(
            "UPDATE otp_codes SET attempts = attempts + 1
             WHERE id = $1 AND attempts < $2
             RETURNING attempts",
        )
        .bind(id)
        .bind(max)
        .fetch_optional(self.pool)
        .await?;
        Ok(attempts)
    }

    /// Mark a code as used. Returns `false` if it was already consumed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn consume(&self, id: i64) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("UPDATE otp_codes SET consumed = TRUE WHERE id = $1 AND NOT consumed")
                .bind(id)
                .execute(self.pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Number of codes issued for a phone since `since`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_since(
        &self,
        phone: &Phone,
        since: DateTime<Utc>,
    ) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM otp_codes WHERE phone = $1 AND created_at > $2")
                .bind(phone)
                .bind(since)
                .fetch_one(self.pool)
                .await?;
        Ok(count)
    }
}

//! Bearer API tokens. Stored as SHA-256 hashes.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use wholesale_core::UserId;

use super::RepositoryError;
use crate::models::User;

pub struct TokenRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TokenRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(
        &self,
        user_id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO auth_tokens (user_id, token_hash, expires_at) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(token_hash)
            .bind(expires_at)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Resolve an unexpired token hash to its user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_user(&self, token_hash: &str) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT u.id, u.phone, u.name, u.email, u.business_name, u.gstin, u.role,
                    u.wallet_balance, u.created_at, u.updated_at
             FROM auth_tokens t
             JOIN users u ON u.id = t.user_id
             WHERE t.token_hash = $1 AND t.expires_at > NOW()",
        )
        .bind(token_hash)
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn revoke(&self, token_hash: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM auth_tokens WHERE token_hash = $1")
            .bind(token_hash)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}

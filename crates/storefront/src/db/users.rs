//! User repository.

use sqlx::PgPool;

use wholesale_core::{Phone, UserId, UserRole};

use super::RepositoryError;
use crate::models::{ProfileUpdate, User};

const USER_COLUMNS: &str = "id, phone, name, email, business_name, gstin, role, \
                            wallet_balance, created_at, updated_at";

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }

    /// Get a user by mobile number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_phone(&self, phone: &Phone) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE phone = $1"
        ))
        .bind(phone)
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }

    /// Return the user with this phone, creating it on first sign-in.
    ///
    /// A name given at sign-in only fills an empty name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_or_create(
        &self,
        phone: &Phone,
        name: Option<&str>,
    ) -> Result<User, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (phone, name) VALUES ($1, $2)
             ON CONFLICT (phone) DO UPDATE
                SET name = COALESCE(users.name, EXCLUDED.name)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(phone)
        .bind(name.map(str::trim).filter(|n| !n.is_empty()))
        .fetch_one(self.pool)
        .await?;
        Ok(user)
    }

    /// Apply a profile update. Fields that are `None` are left unchanged.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                business_name = COALESCE($4, business_name),
                gstin = COALESCE($5, gstin),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(update.name.as_deref())
        .bind(update.email.as_deref())
        .bind(update.business_name.as_deref())
        .bind(update.gstin.as_deref())
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Change a user's role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_role(&self, id: UserId, role: UserRole) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(role)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

//! Address repository.
//!
//! Each user has at most one default address (enforced by a partial unique
//! index). The first address a user saves becomes the default.

use sqlx::PgPool;

use wholesale_core::{AddressId, UserId};

use super::RepositoryError;
use crate::models::{Address, AddressInput};

const ADDRESS_COLUMNS: &str = "id, user_id, name, phone, line1, line2, landmark, city, state, \
                               pincode, is_default, created_at, updated_at";

pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A user's addresses, default first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let addresses = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses
             WHERE user_id = $1
             ORDER BY is_default DESC, created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(addresses)
    }

    /// Get an address owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        user_id: UserId,
        id: AddressId,
    ) -> Result<Option<Address>, RepositoryError> {
        let address = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(address)
    }

    /// Save a new address. It becomes the default if it is the user's first
    /// or if `input.is_default` is set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(
        &self,
        user_id: UserId,
        input: &AddressInput,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let has_default: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM addresses WHERE user_id = $1 AND is_default)",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let make_default = input.is_default || !has_default;
        if make_default && has_default {
            clear_default(&mut tx, user_id).await?;
        }

        let address = sqlx::query_as::<_, Address>(&format!(
            "INSERT INTO addresses (user_id, name, phone, line1, line2, landmark, city, state,
                                    pincode, is_default)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(user_id)
        .bind(input.name.trim())
        .bind(&input.phone)
        .bind(input.line1.trim())
        .bind(input.line2.as_deref())
        .bind(input.landmark.as_deref())
        .bind(input.city.trim())
        .bind(input.state.trim())
        .bind(&input.pincode)
        .bind(make_default)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(address)
    }

    /// Update address fields. The default flag is managed by `set_default`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address is not the user's.
    pub async fn update(
        &self,
        user_id: UserId,
        id: AddressId,
        input: &AddressInput,
    ) -> Result<Address, RepositoryError> {
        sqlx::query_as::<_, Address>(&format!(
            "UPDATE addresses SET
                name = $3, phone = $4, line1 = $5, line2 = $6, landmark = $7,
                city = $8, state = $9, pincode = $10, updated_at = NOW()
             WHERE id = $1 AND user_id = $2
             RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .bind(input.name.trim())
        .bind(&input.phone)
        .bind(input.line1.trim())
        .bind(input.line2.as_deref())
        .bind(input.landmark.as_deref())
        .bind(input.city.trim())
        .bind(input.state.trim())
        .bind(&input.pincode)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Make an address the default, clearing the previous default in the
    /// same transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address is not the user's.
    pub async fn set_default(
        &self,
        user_id: UserId,
        id: AddressId,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        clear_default(&mut tx, user_id).await?;

        let address = sqlx::query_as::<_, Address>(&format!(
            "UPDATE addresses SET is_default = TRUE, updated_at = NOW()
             WHERE id = $1 AND user_id = $2
             RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;
        Ok(address)
    }

    /// Delete a non-default address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address is not the user's.
    /// Returns `RepositoryError::Conflict` if it is the default address.
    pub async fn delete(&self, user_id: UserId, id: AddressId) -> Result<(), RepositoryError> {
        let address = self.get(user_id, id).await?.ok_or(RepositoryError::NotFound)?;
        if address.is_default {
            return Err(RepositoryError::Conflict(
                "cannot delete the default address".to_owned(),
            ));
        }

        sqlx::query("DELETE FROM addresses WHERE id = $1 AND user_id = $2 AND NOT is_default")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}

async fn clear_default(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: UserId,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "UPDATE addresses SET is_default = FALSE, updated_at = NOW()
         WHERE user_id = $1 AND is_default",
    )
    .bind(user_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

//! Warehouse (courier pickup location) repository.
//!
//! The courier API has no delete; removing a warehouse here only hides it.

use sqlx::PgPool;

use wholesale_core::WarehouseId;

use super::RepositoryError;
use crate::models::{Warehouse, WarehouseInput};

const WAREHOUSE_COLUMNS: &str = "id, name, phone, email, address, city, state, pincode, \
                                 return_address, return_city, return_state, return_pincode, \
                                 is_active, created_at, updated_at";

pub struct WarehouseRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WarehouseRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<Warehouse>, RepositoryError> {
        let warehouses = sqlx::query_as::<_, Warehouse>(&format!(
            "SELECT {WAREHOUSE_COLUMNS} FROM warehouses WHERE is_active ORDER BY name"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(warehouses)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: WarehouseId) -> Result<Option<Warehouse>, RepositoryError> {
        let warehouse = sqlx::query_as::<_, Warehouse>(&format!(
            "SELECT {WAREHOUSE_COLUMNS} FROM warehouses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(warehouse)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active_by_name(&self, name: &str) -> Result<Option<Warehouse>, RepositoryError> {
        let warehouse = sqlx::query_as::<_, Warehouse>(&format!(
            "SELECT {WAREHOUSE_COLUMNS} FROM warehouses WHERE name = $1 AND is_active"
        ))
        .bind(name)
        .fetch_optional(self.pool)
        .await?;
        Ok(warehouse)
    }

    /// Insert a warehouse, or reactivate and update one with the same name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(&self, input: &WarehouseInput) -> Result<Warehouse, RepositoryError> {
        let warehouse = sqlx::query_as::<_, Warehouse>(&format!(
            "INSERT INTO warehouses (name, phone, email, address, city, state, pincode,
                                     return_address, return_city, return_state, return_pincode)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             ON CONFLICT (name) DO UPDATE SET
                phone = EXCLUDED.phone, email = EXCLUDED.email, address = EXCLUDED.address,
                city = EXCLUDED.city, state = EXCLUDED.state, pincode = EXCLUDED.pincode,
                return_address = EXCLUDED.return_address, return_city = EXCLUDED.return_city,
                return_state = EXCLUDED.return_state, return_pincode = EXCLUDED.return_pincode,
                is_active = TRUE, updated_at = NOW()
             RETURNING {WAREHOUSE_COLUMNS}"
        ))
        .bind(input.name.trim())
        .bind(&input.phone)
        .bind(input.email.as_deref())
        .bind(input.address.trim())
        .bind(input.city.trim())
        .bind(input.state.trim())
        .bind(&input.pincode)
        .bind(input.return_address.as_deref())
        .bind(input.return_city.as_deref())
        .bind(input.return_state.as_deref())
        .bind(input.return_pincode.as_ref())
        .fetch_one(self.pool)
        .await?;
        Ok(warehouse)
    }

    /// Update a warehouse. The name is the courier-side key and cannot change.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the warehouse does not exist.
    pub async fn update(
        &self,
        id: WarehouseId,
        input: &WarehouseInput,
    ) -> Result<Warehouse, RepositoryError> {
        sqlx::query_as::<_, Warehouse>(&format!(
            "UPDATE warehouses SET
                phone = $2, email = $3, address = $4, city = $5, state = $6, pincode = $7,
                return_address = $8, return_city = $9, return_state = $10, return_pincode = $11,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {WAREHOUSE_COLUMNS}"
        ))
        .bind(id)
        .bind(&input.phone)
        .bind(input.email.as_deref())
        .bind(input.address.trim())
        .bind(input.city.trim())
        .bind(input.state.trim())
        .bind(&input.pincode)
        .bind(input.return_address.as_deref())
        .bind(input.return_city.as_deref())
        .bind(input.return_state.as_deref())
        .bind(input.return_pincode.as_ref())
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the warehouse does not exist.
    pub async fn deactivate(&self, id: WarehouseId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE warehouses SET is_active = FALSE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

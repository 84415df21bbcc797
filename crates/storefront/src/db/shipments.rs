//! Shipment repository.

use sqlx::PgPool;

use wholesale_core::{OrderId, OrderStatus};

use super::RepositoryError;
use crate::models::Shipment;

const SHIPMENT_COLUMNS: &str = "id, order_id, waybill, status, pickup_location, last_tracking, \
                                cancelled, created_at, updated_at";

pub struct ShipmentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ShipmentRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a manifested shipment and move the order to processing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the waybill is already stored.
    pub async fn create(
        &self,
        order_id: OrderId,
        waybill: &str,
        pickup_location: &str,
    ) -> Result<Shipment, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let shipment = sqlx::query_as::<_, Shipment>(&format!(
            "INSERT INTO shipments (order_id, waybill, pickup_location)
             VALUES ($1, $2, $3)
             RETURNING {SHIPMENT_COLUMNS}"
        ))
        .bind(order_id)
        .bind(waybill)
        .bind(pickup_location)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::unique(e, "waybill already exists"))?;

        sqlx::query(
            "UPDATE orders SET
                waybill = $2,
                shipment_status = 'manifested',
                status = CASE WHEN status IN ('pending', 'confirmed')
                              THEN $3 ELSE status END,
                updated_at = NOW()
             WHERE id = $1",
        )
        .bind(order_id)
        .bind(waybill)
        .bind(OrderStatus::Processing)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(shipment)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_waybill(&self, waybill: &str) -> Result<Option<Shipment>, RepositoryError> {
        let shipment = sqlx::query_as::<_, Shipment>(&format!(
            "SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE waybill = $1"
        ))
        .bind(waybill)
        .fetch_optional(self.pool)
        .await?;
        Ok(shipment)
    }

    /// Active (not cancelled) shipment for an order, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active_for_order(
        &self,
        order_id: OrderId,
    ) -> Result<Option<Shipment>, RepositoryError> {
        let shipment = sqlx::query_as::<_, Shipment>(&format!(
            "SELECT {SHIPMENT_COLUMNS} FROM shipments
             WHERE order_id = $1 AND NOT cancelled
             ORDER BY created_at DESC
             LIMIT 1"
        ))
        .bind(order_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(shipment)
    }

    /// Mark a shipment cancelled and clear it from its order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the waybill is unknown.
    pub async fn mark_cancelled(&self, waybill: &str) -> Result<Shipment, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let shipment = sqlx::query_as::<_, Shipment>(&format!(
            "UPDATE shipments SET cancelled = TRUE, status = 'cancelled', updated_at = NOW()
             WHERE waybill = $1
             RETURNING {SHIPMENT_COLUMNS}"
        ))
        .bind(waybill)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        sqlx::query(
            "UPDATE orders SET shipment_status = 'cancelled', updated_at = NOW()
             WHERE id = $1 AND waybill = $2",
        )
        .bind(shipment.order_id)
        .bind(waybill)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(shipment)
    }

    /// Save the latest tracking status for a waybill and its order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn record_tracking(
        &self,
        waybill: &str,
        status: &str,
        payload: &serde_json::Value,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE shipments SET status = $2, last_tracking = $3, updated_at = NOW()
             WHERE waybill = $1",
        )
        .bind(waybill)
        .bind(status)
        .bind(payload)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE orders SET shipment_status = $2, updated_at = NOW() WHERE waybill = $1",
        )
        .bind(waybill)
        .bind(status)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

//! Manifesting, cancelling and tracking courier shipments for orders.

use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument, warn};

use wholesale_core::{OrderId, OrderStatus, PaymentMethod, PaymentStatus};

use crate::config::{DelhiveryConfig, SellerConfig};
use crate::db::{OrderRepository, RepositoryError, ShipmentRepository, WarehouseRepository};
use crate::delhivery::{DelhiveryClient, DelhiveryError, SellerDetails, ShipmentRequest, TrackingInfo};
use crate::models::{Order, Shipment};

#[derive(Debug, Error)]
pub enum ShippingError {
    #[error("Order not found")]
    OrderNotFound,

    #[error("Order cannot be shipped: {0}")]
    NotShippable(String),

    #[error("Order already has an active shipment ({0})")]
    AlreadyShipped(String),

    #[error("No pickup location configured")]
    NoPickupLocation,

    #[error("Unknown warehouse: {0}")]
    UnknownWarehouse(String),

    #[error("Shipment not found")]
    ShipmentNotFound,

    #[error("courier error: {0}")]
    Delhivery(#[from] DelhiveryError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Why an order cannot be handed to the courier yet, if anything.
#[must_use]
pub fn shipping_blocker(order: &Order) -> Option<&'static str> {
    match order.status {
        OrderStatus::Cancelled => return Some("order is cancelled"),
        OrderStatus::Shipped | OrderStatus::Delivered => return Some("order has already shipped"),
        OrderStatus::Pending | OrderStatus::Confirmed | OrderStatus::Processing => {}
    }
    if order.payment_method == PaymentMethod::Razorpay
        && order.payment_status != PaymentStatus::Completed
    {
        return Some("payment has not been received");
    }
    None
}

pub struct ShippingService<'a> {
    pool: &'a PgPool,
    delhivery: &'a DelhiveryClient,
    config: &'a DelhiveryConfig,
    seller: &'a SellerConfig,
}

impl<'a> ShippingService<'a> {
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        delhivery: &'a DelhiveryClient,
        config: &'a DelhiveryConfig,
        seller: &'a SellerConfig,
    ) -> Self {
        Self {
            pool,
            delhivery,
            config,
            seller,
        }
    }

    /// Pickup location to ship from: the named warehouse, the configured
    /// default, or the first active warehouse.
    async fn pickup_location(&self, requested: Option<&str>) -> Result<String, ShippingError> {
        let warehouses = WarehouseRepository::new(self.pool);

        if let Some(name) = requested.map(str::trim).filter(|n| !n.is_empty()) {
            return warehouses
                .get_active_by_name(name)
                .await?
                .map(|w| w.name)
                .ok_or_else(|| ShippingError::UnknownWarehouse(name.to_string()));
        }
        if let Some(name) = &self.config.pickup_location {
            return Ok(name.clone());
        }
        warehouses
            .list_active()
            .await?
            .into_iter()
            .next()
            .map(|w| w.name)
            .ok_or(ShippingError::NoPickupLocation)
    }

    /// Manifest a shipment for an order and record its waybill.
    ///
    /// # Errors
    ///
    /// Returns `ShippingError::NotShippable` for cancelled, shipped or unpaid
    /// prepaid orders, `ShippingError::AlreadyShipped` if a live shipment
    /// exists, or the courier's rejection.
    #[instrument(skip(self))]
    pub async fn create_for_order(
        &self,
        order_id: OrderId,
        warehouse: Option<&str>,
    ) -> Result<Shipment, ShippingError> {
        let order = OrderRepository::new(self.pool)
            .get(order_id)
            .await?
            .ok_or(ShippingError::OrderNotFound)?;
        self.create_for(&order, warehouse).await
    }

    /// As [`Self::create_for_order`], for an order already loaded.
    ///
    /// # Errors
    ///
    /// See [`Self::create_for_order`].
    pub async fn create_for(
        &self,
        order: &Order,
        warehouse: Option<&str>,
    ) -> Result<Shipment, ShippingError> {
        if let Some(reason) = shipping_blocker(order) {
            return Err(ShippingError::NotShippable(reason.to_string()));
        }

        let shipments = ShipmentRepository::new(self.pool);
        if let Some(existing) = shipments.active_for_order(order.id).await? {
            return Err(ShippingError::AlreadyShipped(existing.waybill));
        }

        let pickup = self.pickup_location(warehouse).await?;
        let seller = SellerDetails {
            name: self.seller.name.clone(),
            address: self.seller.address.clone(),
            gstin: self.seller.gstin.clone(),
            invoice_number: order.invoice_number.clone(),
        };
        let request = ShipmentRequest::from_order(order, &pickup, Some(seller));
        let created = self.delhivery.create_shipment(&request).await?;

        let shipment = shipments.create(order.id, &created.waybill, &pickup).await?;
        info!(
            order_number = %order.order_number,
            waybill = %shipment.waybill,
            pickup = %pickup,
            "Shipment created"
        );
        Ok(shipment)
    }

    /// Cancel a shipment with the courier and locally.
    ///
    /// # Errors
    ///
    /// Returns `ShippingError::ShipmentNotFound` for an unknown waybill, or
    /// the courier's refusal.
    #[instrument(skip(self))]
    pub async fn cancel(&self, waybill: &str) -> Result<Shipment, ShippingError> {
        let shipments = ShipmentRepository::new(self.pool);
        let shipment = shipments
            .get_by_waybill(waybill)
            .await?
            .ok_or(ShippingError::ShipmentNotFound)?;
        if shipment.cancelled {
            return Ok(shipment);
        }

        self.delhivery.cancel_shipment(waybill).await?;
        Ok(shipments.mark_cancelled(waybill).await?)
    }

    /// Track an order's shipment, saving the latest status.
    ///
    /// # Errors
    ///
    /// Returns `ShippingError::ShipmentNotFound` if the order has no waybill.
    #[instrument(skip(self, order), fields(order_number = %order.order_number))]
    pub async fn track_order(&self, order: &Order) -> Result<TrackingInfo, ShippingError> {
        let waybill = order
            .waybill
            .as_deref()
            .ok_or(ShippingError::ShipmentNotFound)?;
        self.track(waybill).await
    }

    /// Track a waybill, saving the latest status when it is ours.
    ///
    /// # Errors
    ///
    /// Returns the courier error if tracking fails.
    pub async fn track(&self, waybill: &str) -> Result<TrackingInfo, ShippingError> {
        let info = self.delhivery.track(waybill).await?;

        let payload = serde_json::to_value(&info).unwrap_or_default();
        if let Err(e) = ShipmentRepository::new(self.pool)
            .record_tracking(waybill, &info.status, &payload)
            .await
        {
            warn!(error = %e, "Failed to save tracking status");
        }

        Ok(info)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::order::tests::sample_order;

    #[test]
    fn test_paid_order_is_shippable() {
        assert!(shipping_blocker(&sample_order()).is_none());
    }

    #[test]
    fn test_unpaid_prepaid_order_blocked() {
        let mut order = sample_order();
        order.payment_status = PaymentStatus::Pending;
        assert_eq!(shipping_blocker(&order), Some("payment has not been received"));
    }

    #[test]
    fn test_unpaid_cod_order_shippable() {
        let mut order = sample_order();
        order.payment_method = PaymentMethod::Cod;
        order.payment_status = PaymentStatus::Pending;
        assert!(shipping_blocker(&order).is_none());
    }

    #[test]
    fn test_cancelled_and_shipped_blocked() {
        let mut order = sample_order();
        order.status = OrderStatus::Cancelled;
        assert!(shipping_blocker(&order).is_some());
        order.status = OrderStatus::Shipped;
        assert!(shipping_blocker(&order).is_some());
    }
}

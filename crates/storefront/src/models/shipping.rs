//! Courier shipments and pickup warehouses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wholesale_core::{OrderId, Phone, Pincode, ShipmentId, WarehouseId};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    pub id: ShipmentId,
    pub order_id: OrderId,
    pub waybill: String,
    pub status: String,
    pub pickup_location: String,
    pub last_tracking: Option<serde_json::Value>,
    pub cancelled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A pickup location registered with the courier under `name`.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Warehouse {
    pub id: WarehouseId,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub return_address: Option<String>,
    pub return_city: Option<String>,
    pub return_state: Option<String>,
    pub return_pincode: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseInput {
    pub name: String,
    pub phone: Phone,
    pub email: Option<String>,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: Pincode,
    pub return_address: Option<String>,
    pub return_city: Option<String>,
    pub return_state: Option<String>,
    pub return_pincode: Option<Pincode>,
}

impl WarehouseInput {
    /// # Errors
    ///
    /// Returns a message naming the first blank required field.
    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("name", &self.name),
            ("address", &self.address),
            ("city", &self.city),
            ("state", &self.state),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{field} is required"));
            }
        }
        Ok(())
    }
}

//! Saved delivery addresses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wholesale_core::{AddressId, Phone, Pincode, UserId};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub name: String,
    pub phone: Phone,
    pub line1: String,
    pub line2: Option<String>,
    pub landmark: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: Pincode,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/update payload. Phone and pincode are validated on deserialize.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    pub name: String,
    pub phone: Phone,
    #[serde(alias = "addressLine1", alias = "address_line1")]
    pub line1: String,
    #[serde(default, alias = "addressLine2", alias = "address_line2")]
    pub line2: Option<String>,
    #[serde(default)]
    pub landmark: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: Pincode,
    #[serde(default)]
    pub is_default: bool,
}

impl AddressInput {
    /// # Errors
    ///
    /// Returns a message naming the first blank required field.
    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("name", &self.name),
            ("line1", &self.line1),
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

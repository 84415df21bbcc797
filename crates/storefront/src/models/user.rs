//! User domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wholesale_core::{Phone, UserId, UserRole};

/// A buyer or staff account, identified by mobile number.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub phone: Phone,
    pub name: Option<String>,
    pub email: Option<String>,
    pub business_name: Option<String>,
    /// GST registration of the buyer's business, printed on invoices.
    pub gstin: Option<String>,
    pub role: UserRole,
    /// Store credit available at checkout.
    pub wallet_balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Profile fields a user may change. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(alias = "business_name")]
    pub business_name: Option<String>,
    pub gstin: Option<String>,
}

//! Cart models.
//!
//! A cart line is identified by product and variant. The API exposes that
//! pair as a string key `"{productId}:{variantIndex}"` where a product
//! without variants uses `-1`, matching how the row is stored.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wholesale_core::{CartItemId, ProductId, UserId};

/// Stored variant index for lines without a variant.
pub const NO_VARIANT: i32 = -1;

/// A stored cart row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: CartItemId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub variant_index: i32,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartItem {
    #[must_use]
    pub fn key(&self) -> CartKey {
        CartKey::new(self.product_id, variant_from_db(self.variant_index))
    }
}

/// Convert an API variant index to the stored form.
#[must_use]
pub fn variant_to_db(index: Option<usize>) -> i32 {
    index
        .and_then(|i| i32::try_from(i).ok())
        .unwrap_or(NO_VARIANT)
}

/// Convert a stored variant index to the API form.
#[must_use]
pub fn variant_from_db(index: i32) -> Option<usize> {
    usize::try_from(index).ok()
}

/// Identity of a cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CartKey {
    pub product_id: ProductId,
    pub variant_index: Option<usize>,
}

impl CartKey {
    #[must_use]
    pub const fn new(product_id: ProductId, variant_index: Option<usize>) -> Self {
        Self {
            product_id,
            variant_index,
        }
    }
}

impl fmt::Display for CartKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.variant_index {
            Some(i) => write!(f, "{}:{i}", self.product_id),
            None => write!(f, "{}:{NO_VARIANT}", self.product_id),
        }
    }
}

/// Error parsing a cart key string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid cart key: {0}")]
pub struct InvalidCartKey(String);

impl FromStr for CartKey {
    type Err = InvalidCartKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidCartKey(s.to_owned());
        let (product, variant) = s.split_once(':').unwrap_or((s, ""));
        let product_id = product.parse::<ProductId>().map_err(|_| invalid())?;
        let variant_index = match variant.trim() {
            "" | "-1" | "null" | "undefined" => None,
            v => Some(v.parse::<usize>().map_err(|_| invalid())?),
        };
        Ok(Self::new(product_id, variant_index))
    }
}

impl Serialize for CartKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CartKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A cart line with the product resolved and priced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub key: CartKey,
    pub product_id: ProductId,
    pub variant_index: Option<usize>,
    pub name: String,
    pub slug: String,
    pub variant_name: Option<String>,
    pub image: Option<String>,
    pub unit_price: Decimal,
    pub mrp: Option<Decimal>,
    pub quantity: i32,
    pub line_total: Decimal,
    pub min_order_quantity: i32,
    pub stock: i32,
    /// Set when the line can no longer be ordered as is (MOQ, stock,
    /// product withdrawn).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,
}

/// The whole cart as returned by `GET /api/cart`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub items: Vec<CartLine>,
    pub subtotal: Decimal,
    pub item_count: i64,
}

impl CartSummary {
    #[must_use]
    pub fn from_lines(items: Vec<CartLine>) -> Self {
        let subtotal = items.iter().map(|l| l.line_total).sum();
        let item_count = items.iter().map(|l| i64::from(l.quantity)).sum();
        Self {
            items,
            subtotal,
            item_count,
        }
    }

    /// Whether every line can be checked out.
    #[must_use]
    pub fn is_orderable(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(|l| l.problem.is_none())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display() {
        assert_eq!(CartKey::new(ProductId::new(7), Some(2)).to_string(), "7:2");
        assert_eq!(CartKey::new(ProductId::new(7), None).to_string(), "7:-1");
    }

    #[test]
    fn test_key_parse_accepts_frontend_forms() {
        let none = CartKey::new(ProductId::new(7), None);
        assert_eq!("7:-1".parse::<CartKey>().unwrap(), none);
        assert_eq!("7:null".parse::<CartKey>().unwrap(), none);
        assert_eq!("7".parse::<CartKey>().unwrap(), none);
        assert_eq!(
            "7:3".parse::<CartKey>().unwrap(),
            CartKey::new(ProductId::new(7), Some(3))
        );
        assert!("abc:1".parse::<CartKey>().is_err());
        assert!("7:x".parse::<CartKey>().is_err());
    }

    #[test]
    fn test_variant_db_mapping() {
        assert_eq!(variant_to_db(None), NO_VARIANT);
        assert_eq!(variant_to_db(Some(4)), 4);
        assert_eq!(variant_from_db(NO_VARIANT), None);
        assert_eq!(variant_from_db(0), Some(0));
    }
}

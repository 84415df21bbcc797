//! Orders and gateway payments.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wholesale_core::{
    OrderId, OrderStatus, PaymentId, PaymentMethod, PaymentRecordStatus, PaymentStatus, ProductId,
    UserId,
};

use super::Address;

/// A line of an order, frozen at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub variant_index: Option<usize>,
    pub name: String,
    pub variant_name: Option<String>,
    pub sku: Option<String>,
    pub hsn_code: Option<String>,
    pub gst_rate: Decimal,
    /// GST-inclusive unit price after tier pricing.
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
    pub weight_grams: i32,
    pub image: Option<String>,
}

/// Delivery address copied onto the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub name: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub landmark: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

impl From<&Address> for ShippingAddress {
    fn from(a: &Address) -> Self {
        Self {
            name: a.name.clone(),
            phone: a.phone.to_string(),
            line1: a.line1.clone(),
            line2: a.line2.clone(),
            landmark: a.landmark.clone(),
            city: a.city.clone(),
            state: a.state.clone(),
            pincode: a.pincode.to_string(),
        }
    }
}

impl ShippingAddress {
    /// Single-line street address for courier manifests.
    #[must_use]
    pub fn street(&self) -> String {
        [Some(self.line1.as_str()), self.line2.as_deref(), self.landmark.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: UserId,
    #[sqlx(json)]
    pub items: Vec<OrderItem>,
    #[sqlx(json)]
    pub shipping_address: ShippingAddress,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping_fee: Decimal,
    pub wallet_used: Decimal,
    /// Amount payable through the chosen payment method.
    pub total: Decimal,
    pub coupon_code: Option<String>,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub razorpay_order_id: Option<String>,
    pub invoice_number: Option<String>,
    pub waybill: Option<String>,
    pub shipment_status: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Money to return to the buyer's wallet if the order is cancelled now.
    #[must_use]
    pub fn refundable_amount(&self) -> Decimal {
        let paid = if self.payment_method == PaymentMethod::Razorpay
            && self.payment_status == PaymentStatus::Completed
        {
            self.total
        } else {
            Decimal::ZERO
        };
        paid + self.wallet_used
    }

    #[must_use]
    pub fn total_weight_grams(&self) -> i64 {
        self.items
            .iter()
            .map(|i| i64::from(i.weight_grams) * i64::from(i.quantity))
            .sum()
    }

    #[must_use]
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i64::from(i.quantity)).sum()
    }
}

/// A gateway payment attempt recorded against an order.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub razorpay_payment_id: String,
    pub razorpay_order_id: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub method: Option<String>,
    pub status: PaymentRecordStatus,
    pub error_description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_order() -> Order {
        Order {
            id: OrderId::new(1),
            order_number: "WH2603010001AB".to_string(),
            user_id: UserId::new(1),
            items: vec![OrderItem {
                product_id: ProductId::new(3),
                variant_index: None,
                name: "Steel Tumbler".to_string(),
                variant_name: None,
                sku: Some("TMB-01".to_string()),
                hsn_code: Some("7323".to_string()),
                gst_rate: Decimal::from(18),
                unit_price: Decimal::from(118),
                quantity: 10,
                line_total: Decimal::from(1180),
                weight_grams: 200,
                image: None,
            }],
            shipping_address: ShippingAddress {
                name: "Asha Traders".to_string(),
                phone: "9876543210".to_string(),
                line1: "4 Mill Road".to_string(),
                line2: None,
                landmark: Some("Near Bus Stand".to_string()),
                city: "Pune".to_string(),
                state: "Maharashtra".to_string(),
                pincode: "411001".to_string(),
            },
            subtotal: Decimal::from(1180),
            discount: Decimal::ZERO,
            shipping_fee: Decimal::from(150),
            wallet_used: Decimal::from(30),
            total: Decimal::from(1300),
            coupon_code: None,
            payment_method: PaymentMethod::Razorpay,
            payment_status: PaymentStatus::Completed,
            status: OrderStatus::Confirmed,
            razorpay_order_id: Some("order_abc".to_string()),
            invoice_number: Some("INV-2026-000001".to_string()),
            waybill: None,
            shipment_status: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_refundable_amount_includes_wallet() {
        let order = sample_order();
        assert_eq!(order.refundable_amount(), Decimal::from(1330));
    }

    #[test]
    fn test_refundable_amount_unpaid_cod() {
        let mut order = sample_order();
        order.payment_method = PaymentMethod::Cod;
        order.payment_status = PaymentStatus::Pending;
        assert_eq!(order.refundable_amount(), Decimal::from(30));
    }

    #[test]
    fn test_street_skips_blank_parts() {
        let mut address = sample_order().shipping_address;
        address.line2 = Some(String::new());
        assert_eq!(address.street(), "4 Mill Road, Near Bus Stand");
    }

    #[test]
    fn test_weight_and_quantity() {
        let order = sample_order();
        assert_eq!(order.total_weight_grams(), 2000);
        assert_eq!(order.total_quantity(), 10);
    }
}

//! GST invoice figures.
//!
//! Catalog prices include GST. Each line's taxable value is backed out of
//! the inclusive amount at the line's GST rate. Intra-state sales split the
//! tax equally into CGST and SGST; inter-state sales carry IGST.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::config::SellerConfig;
use crate::models::catalog::MAX_GST_RATE;
use crate::models::{Order, ShippingAddress};

/// One invoice line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLine {
    pub description: String,
    pub hsn_code: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub gst_rate: Decimal,
    pub taxable_value: Decimal,
    pub cgst: Decimal,
    pub sgst: Decimal,
    pub igst: Decimal,
    /// GST-inclusive line amount.
    pub amount: Decimal,
}

/// A computed invoice for one order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub invoice_number: String,
    pub order_number: String,
    pub date: String,
    pub seller_name: String,
    pub seller_gstin: Option<String>,
    pub seller_address: String,
    pub seller_state: String,
    pub buyer: ShippingAddress,
    pub buyer_business: Option<String>,
    pub buyer_gstin: Option<String>,
    pub intra_state: bool,
    pub lines: Vec<InvoiceLine>,
    pub taxable_total: Decimal,
    pub cgst_total: Decimal,
    pub sgst_total: Decimal,
    pub igst_total: Decimal,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping_fee: Decimal,
    pub wallet_used: Decimal,
    pub grand_total: Decimal,
    pub amount_due: Decimal,
    pub payment_method: String,
}

fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn same_state(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Split a GST-inclusive amount into `(taxable, cgst, sgst, igst)`.
///
/// Rates outside `0..=MAX_GST_RATE` are clamped into that range.
#[must_use]
pub fn split_gst(
    inclusive: Decimal,
    rate: Decimal,
    intra_state: bool,
) -> (Decimal, Decimal, Decimal, Decimal) {
    let rate = rate.clamp(Decimal::ZERO, MAX_GST_RATE);
    let taxable = round2(inclusive * Decimal::ONE_HUNDRED / (Decimal::ONE_HUNDRED + rate));
    let tax = inclusive - taxable;
    if intra_state {
        let cgst = round2(tax / Decimal::TWO);
        (taxable, cgst, tax - cgst, Decimal::ZERO)
    } else {
        (taxable, Decimal::ZERO, Decimal::ZERO, tax)
    }
}

impl Invoice {
    /// Build the invoice for an order that has an invoice number.
    ///
    /// Returns `None` while the order has not been invoiced.
    #[must_use]
    pub fn for_order(
        order: &Order,
        seller: &SellerConfig,
        buyer_business: Option<String>,
        buyer_gstin: Option<String>,
    ) -> Option<Self> {
        let invoice_number = order.invoice_number.clone()?;
        let intra_state = same_state(&seller.state, &order.shipping_address.state);

        let lines: Vec<InvoiceLine> = order
            .items
            .iter()
            .map(|item| {
                let (taxable_value, cgst, sgst, igst) =
                    split_gst(item.line_total, item.gst_rate, intra_state);
                InvoiceLine {
                    description: match &item.variant_name {
                        Some(v) => format!("{} ({v})", item.name),
                        None => item.name.clone(),
                    },
                    hsn_code: item.hsn_code.clone().unwrap_or_default(),
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    gst_rate: item.gst_rate,
                    taxable_value,
                    cgst,
                    sgst,
                    igst,
                    amount: item.line_total,
                }
            })
            .collect();

        let sum = |f: fn(&InvoiceLine) -> Decimal| lines.iter().map(f).sum::<Decimal>();
        let grand_total = order.subtotal - order.discount + order.shipping_fee;

        Some(Self {
            invoice_number,
            order_number: order.order_number.clone(),
            date: order.created_at.format("%d %b %Y").to_string(),
            seller_name: seller.name.clone(),
            seller_gstin: seller.gstin.clone(),
            seller_address: seller.address.clone(),
            seller_state: seller.state.clone(),
            buyer: order.shipping_address.clone(),
            buyer_business,
            buyer_gstin,
            intra_state,
            taxable_total: sum(|l| l.taxable_value),
            cgst_total: sum(|l| l.cgst),
            sgst_total: sum(|l| l.sgst),
            igst_total: sum(|l| l.igst),
            lines,
            subtotal: order.subtotal,
            discount: order.discount,
            shipping_fee: order.shipping_fee,
            wallet_used: order.wallet_used,
            grand_total,
            amount_due: order.total,
            payment_method: order.payment_method.to_string(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::order::tests::sample_order;

    fn seller(state: &str) -> SellerConfig {
        SellerConfig {
            name: "Wholesale Traders".to_string(),
            gstin: Some("27AAAAA0000A1Z5".to_string()),
            address: "12 Market Yard, Pune".to_string(),
            state: state.to_string(),
        }
    }

    #[test]
    fn test_split_intra_state() {
        let (taxable, cgst, sgst, igst) = split_gst(Decimal::from(1180), Decimal::from(18), true);
        assert_eq!(taxable, Decimal::from(1000));
        assert_eq!(cgst, Decimal::from(90));
        assert_eq!(sgst, Decimal::from(90));
        assert_eq!(igst, Decimal::ZERO);
    }

    #[test]
    fn test_split_inter_state() {
        let (taxable, cgst, sgst, igst) = split_gst(Decimal::from(1180), Decimal::from(18), false);
        assert_eq!(taxable, Decimal::from(1000));
        assert_eq!(cgst + sgst, Decimal::ZERO);
        assert_eq!(igst, Decimal::from(180));
    }

    #[test]
    fn test_split_odd_paise_stays_balanced() {
        let inclusive = Decimal::new(10001, 2);
        let (taxable, cgst, sgst, _) = split_gst(inclusive, Decimal::from(5), true);
        assert_eq!(taxable + cgst + sgst, inclusive);
    }

    #[test]
    fn test_split_with_corrupt_rate_does_not_divide_by_zero() {
        let (taxable, cgst, sgst, igst) =
            split_gst(Decimal::from(100), Decimal::from(-100), true);
        assert_eq!(taxable, Decimal::from(100));
        assert_eq!(cgst + sgst + igst, Decimal::ZERO);
    }

    #[test]
    fn test_invoice_same_state_uses_cgst_sgst() {
        let order = sample_order();
        let invoice = Invoice::for_order(&order, &seller("maharashtra"), None, None).unwrap();
        assert!(invoice.intra_state);
        assert_eq!(invoice.cgst_total, Decimal::from(90));
        assert_eq!(invoice.igst_total, Decimal::ZERO);
        assert_eq!(invoice.grand_total, Decimal::from(1330));
        assert_eq!(invoice.amount_due, Decimal::from(1300));
    }

    #[test]
    fn test_invoice_other_state_uses_igst() {
        let order = sample_order();
        let invoice = Invoice::for_order(&order, &seller("Delhi"), None, None).unwrap();
        assert!(!invoice.intra_state);
        assert_eq!(invoice.igst_total, Decimal::from(180));
    }

    #[test]
    fn test_no_invoice_before_numbering() {
        let mut order = sample_order();
        order.invoice_number = None;
        assert!(Invoice::for_order(&order, &seller("Delhi"), None, None).is_none());
    }
}

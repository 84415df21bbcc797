//! Cart pricing.
//!
//! Unit price resolution, in order of precedence:
//!
//! 1. The product's base `price`
//! 2. The variant's `price`, when the line has a variant that sets one
//! 3. The highest price tier whose `min_quantity` is at most the quantity
//!
//! A line is orderable when the product is active, the variant exists, the
//! quantity meets the minimum order quantity and stock covers it.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::debug;

use wholesale_core::ProductId;

use crate::models::{CartItem, CartKey, CartLine, CartSummary, PriceTier, Product};

/// Unit price for `quantity` units of a product (and optional variant).
#[must_use]
pub fn unit_price(product: &Product, variant_index: Option<usize>, quantity: i32) -> Decimal {
    let base = product
        .variant(variant_index)
        .and_then(|v| v.price)
        .unwrap_or(product.price);

    best_tier(&product.price_tiers, quantity).map_or(base, |tier| tier.price)
}

fn best_tier(tiers: &[PriceTier], quantity: i32) -> Option<&PriceTier> {
    tiers
        .iter()
        .filter(|t| t.min_quantity <= quantity)
        .max_by_key(|t| t.min_quantity)
}

/// Units available for a product line: variant stock when a variant is
/// chosen, product stock otherwise.
#[must_use]
pub fn available_stock(product: &Product, variant_index: Option<usize>) -> i32 {
    match variant_index {
        Some(_) => product.variant(variant_index).map_or(0, |v| v.stock),
        None => product.stock,
    }
}

/// Why `quantity` units of this line cannot be ordered, if anything.
#[must_use]
pub fn line_problem(product: &Product, variant_index: Option<usize>, quantity: i32) -> Option<String> {
    if !product.is_active {
        return Some("This product is no longer available".to_string());
    }
    if variant_index.is_some() && product.variant(variant_index).is_none() {
        return Some("The selected option is no longer available".to_string());
    }
    if quantity < product.min_order_quantity {
        return Some(format!(
            "Minimum order quantity is {}",
            product.min_order_quantity
        ));
    }
    let stock = available_stock(product, variant_index);
    if quantity > stock {
        return Some(if stock <= 0 {
            "Out of stock".to_string()
        } else {
            format!("Only {stock} in stock")
        });
    }
    None
}

/// Price one line.
#[must_use]
pub fn price_line(product: &Product, key: CartKey, quantity: i32) -> CartLine {
    let variant = product.variant(key.variant_index);
    let unit = unit_price(product, key.variant_index, quantity);

    CartLine {
        key,
        product_id: product.id,
        variant_index: key.variant_index,
        name: product.name.clone(),
        slug: product.slug.clone(),
        variant_name: variant.map(|v| v.name.clone()),
        image: product.primary_image().map(String::from),
        unit_price: unit,
        mrp: variant.and_then(|v| v.mrp).or(product.mrp),
        quantity,
        line_total: unit * Decimal::from(quantity),
        min_order_quantity: product.min_order_quantity,
        stock: available_stock(product, key.variant_index),
        problem: line_problem(product, key.variant_index, quantity),
    }
}

/// Price a stored cart. Lines whose product has been deleted are dropped.
#[must_use]
pub fn price_cart(items: &[CartItem], products: &[Product]) -> CartSummary {
    let by_id: HashMap<ProductId, &Product> = products.iter().map(|p| (p.id, p)).collect();

    let lines = items
        .iter()
        .filter_map(|item| {
            let product = by_id.get(&item.product_id);
            if product.is_none() {
                debug!(product_id = %item.product_id, "Dropping cart line for missing product");
            }
            product.map(|p| price_line(p, item.key(), item.quantity))
        })
        .collect();

    CartSummary::from_lines(lines)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::Variant;

    pub(crate) fn product() -> Product {
        Product {
            id: ProductId::new(3),
            name: "Steel Tumbler".to_string(),
            slug: "steel-tumbler".to_string(),
            description: None,
            category_id: None,
            price: Decimal::from(120),
            mrp: Some(Decimal::from(150)),
            min_order_quantity: 10,
            stock: 500,
            images: vec!["/img/tumbler.jpg".to_string()],
            variants: vec![
                Variant {
                    name: "300 ml".to_string(),
                    sku: Some("TMB-300".to_string()),
                    price: None,
                    mrp: None,
                    stock: 40,
                },
                Variant {
                    name: "500 ml".to_string(),
                    sku: Some("TMB-500".to_string()),
                    price: Some(Decimal::from(160)),
                    mrp: Some(Decimal::from(200)),
                    stock: 0,
                },
            ],
            price_tiers: vec![
                PriceTier {
                    min_quantity: 100,
                    price: Decimal::from(100),
                },
                PriceTier {
                    min_quantity: 50,
                    price: Decimal::from(110),
                },
            ],
            weight_grams: 200,
            hsn_code: Some("7323".to_string()),
            gst_rate: Decimal::from(18),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_base_price_below_tiers() {
        assert_eq!(unit_price(&product(), None, 10), Decimal::from(120));
    }

    #[test]
    fn test_variant_price_overrides_base() {
        assert_eq!(unit_price(&product(), Some(1), 10), Decimal::from(160));
        assert_eq!(unit_price(&product(), Some(0), 10), Decimal::from(120));
    }

    #[test]
    fn test_highest_matching_tier_wins() {
        let p = product();
        assert_eq!(unit_price(&p, None, 50), Decimal::from(110));
        assert_eq!(unit_price(&p, None, 99), Decimal::from(110));
        assert_eq!(unit_price(&p, None, 100), Decimal::from(100));
        assert_eq!(unit_price(&p, Some(1), 100), Decimal::from(100));
    }

    #[test]
    fn test_moq_problem() {
        let problem = line_problem(&product(), None, 5).unwrap();
        assert_eq!(problem, "Minimum order quantity is 10");
    }

    #[test]
    fn test_variant_stock_checked() {
        let p = product();
        assert_eq!(line_problem(&p, Some(0), 41).unwrap(), "Only 40 in stock");
        assert_eq!(line_problem(&p, Some(1), 10).unwrap(), "Out of stock");
        assert!(line_problem(&p, Some(0), 40).is_none());
        assert!(line_problem(&p, Some(7), 10).is_some());
    }

    #[test]
    fn test_inactive_product_problem() {
        let mut p = product();
        p.is_active = false;
        assert!(line_problem(&p, None, 10).is_some());
    }

    #[test]
    fn test_price_line_totals() {
        let p = product();
        let line = price_line(&p, CartKey::new(p.id, None), 60);
        assert_eq!(line.unit_price, Decimal::from(110));
        assert_eq!(line.line_total, Decimal::from(6600));
        assert_eq!(line.key.to_string(), "3:-1");
        assert!(line.problem.is_none());
    }

    #[test]
    fn test_price_cart_drops_missing_products() {
        let p = product();
        let now = Utc::now();
        let item = |product_id: i64, variant_index: i32, quantity: i32| CartItem {
            id: wholesale_core::CartItemId::new(product_id),
            user_id: wholesale_core::UserId::new(1),
            product_id: ProductId::new(product_id),
            variant_index,
            quantity,
            created_at: now,
            updated_at: now,
        };
        let summary = price_cart(&[item(3, -1, 10), item(3, 0, 20), item(99, -1, 5)], &[p]);
        assert_eq!(summary.items.len(), 2);
        assert_eq!(summary.subtotal, Decimal::from(3600));
        assert_eq!(summary.item_count, 30);
        assert!(summary.is_orderable());
    }
}

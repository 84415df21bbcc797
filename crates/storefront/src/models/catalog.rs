//! Catalog models: categories, products, variants and reviews.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wholesale_core::{CategoryId, ProductId, ReviewId, UserId};

/// A product category. Categories nest; `level` is 0 for roots.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub parent_id: Option<CategoryId>,
    pub level: i32,
    pub image_url: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A category with its subcategories, for menu rendering.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    pub children: Vec<Self>,
}

impl CategoryNode {
    /// Build a forest from a flat list. Categories whose parent is missing
    /// (inactive or deleted) are treated as roots.
    #[must_use]
    pub fn build_tree(categories: Vec<Category>) -> Vec<Self> {
        let ids: std::collections::HashSet<CategoryId> =
            categories.iter().map(|c| c.id).collect();
        let (roots, rest): (Vec<_>, Vec<_>) = categories
            .into_iter()
            .partition(|c| c.parent_id.is_none_or(|p| !ids.contains(&p)));

        let mut pending = rest;
        roots
            .into_iter()
            .map(|root| Self::attach(root, &mut pending))
            .collect()
    }

    fn attach(category: Category, pending: &mut Vec<Category>) -> Self {
        let (mine, others): (Vec<_>, Vec<_>) = std::mem::take(pending)
            .into_iter()
            .partition(|c| c.parent_id == Some(category.id));
        *pending = others;
        let children = mine
            .into_iter()
            .map(|child| Self::attach(child, pending))
            .collect();
        Self { category, children }
    }
}

/// A purchasable variant of a product (size, pack, colour...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    /// Overrides the product price when set.
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub mrp: Option<Decimal>,
    #[serde(default)]
    pub stock: i32,
}

/// Quantity-break price: buying at least `min_quantity` units costs `price` each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceTier {
    pub min_quantity: i32,
    pub price: Decimal,
}

/// A catalog product.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub price: Decimal,
    pub mrp: Option<Decimal>,
    /// Minimum order quantity (MOQ) per cart line.
    pub min_order_quantity: i32,
    pub stock: i32,
    pub images: Vec<String>,
    #[sqlx(json)]
    pub variants: Vec<Variant>,
    #[sqlx(json)]
    pub price_tiers: Vec<PriceTier>,
    pub weight_grams: i32,
    pub hsn_code: Option<String>,
    /// GST percentage included in the price.
    pub gst_rate: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Look up a variant by its position in `variants`.
    #[must_use]
    pub fn variant(&self, index: Option<usize>) -> Option<&Variant> {
        index.and_then(|i| self.variants.get(i))
    }

    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

/// Admin payload for creating or replacing a product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<CategoryId>,
    pub price: Decimal,
    pub mrp: Option<Decimal>,
    #[serde(default = "default_moq")]
    pub min_order_quantity: i32,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub price_tiers: Vec<PriceTier>,
    #[serde(default = "default_weight")]
    pub weight_grams: i32,
    pub hsn_code: Option<String>,
    #[serde(default = "default_gst_rate")]
    pub gst_rate: Decimal,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

const fn default_moq() -> i32 {
    1
}

const fn default_weight() -> i32 {
    500
}

fn default_gst_rate() -> Decimal {
    Decimal::from(18)
}

/// Highest GST slab a product can carry, in percent.
pub const MAX_GST_RATE: Decimal = Decimal::from_parts(28, 0, 0, false, 0);

const fn default_true() -> bool {
    true
}

impl ProductInput {
    /// Check the fields the database cannot.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name is required".to_string());
        }
        if self.price < Decimal::ZERO {
            return Err("price cannot be negative".to_string());
        }
        if self.min_order_quantity < 1 {
            return Err("minOrderQuantity must be at least 1".to_string());
        }
        if self.stock < 0 || self.variants.iter().any(|v| v.stock < 0) {
            return Err("stock cannot be negative".to_string());
        }
        if self
            .price_tiers
            .iter()
            .any(|t| t.min_quantity < 1 || t.price < Decimal::ZERO)
        {
            return Err("price tiers need a positive minQuantity and price".to_string());
        }
        if self.gst_rate < Decimal::ZERO || self.gst_rate > MAX_GST_RATE {
            return Err(format!("gstRate must be between 0 and {MAX_GST_RATE}"));
        }
        Ok(())
    }

    /// The slug to store: the explicit one, or one derived from the name.
    #[must_use]
    pub fn slug(&self) -> String {
        self.slug
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map_or_else(|| slugify(&self.name), slugify)
    }
}

/// Lowercase, ASCII alphanumerics separated by single dashes.
#[must_use]
pub fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_end_matches('-').to_string()
}

/// Average rating and review count for a product.
#[derive(Debug, Clone, Default, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub average: Option<f64>,
    pub count: i64,
}

/// A buyer's review. One per user per product.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub user_id: UserId,
    pub product_id: ProductId,
    /// Reviewer's display name.
    pub author: Option<String>,
    pub rating: i16,
    pub title: Option<String>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn category(id: i64, parent: Option<i64>, level: i32) -> Category {
        Category {
            id: CategoryId::new(id),
            name: format!("Category {id}"),
            slug: format!("category-{id}"),
            description: None,
            parent_id: parent.map(CategoryId::new),
            level,
            image_url: None,
            sort_order: 0,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_build_tree_nests_children() {
        let tree = CategoryNode::build_tree(vec![
            category(1, None, 0),
            category(2, Some(1), 1),
            category(3, Some(2), 2),
            category(4, None, 0),
        ]);

        assert_eq!(tree.len(), 2);
        let first = tree.first().unwrap();
        assert_eq!(first.children.len(), 1);
        assert_eq!(
            first.children.first().unwrap().children.first().unwrap().category.id,
            CategoryId::new(3)
        );
    }

    #[test]
    fn test_build_tree_promotes_orphans() {
        let tree = CategoryNode::build_tree(vec![category(5, Some(99), 1)]);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Cotton Kurta (Pack of 10)"), "cotton-kurta-pack-of-10");
        assert_eq!(slugify("  --Hello--  "), "hello");
    }

    fn input(gst_rate: &str) -> ProductInput {
        serde_json::from_str(&format!(
            r#"{{"name":"Steel Tumbler","price":"40.00","gstRate":"{gst_rate}"}}"#
        ))
        .unwrap()
    }

    #[test]
    fn test_validate_rejects_gst_rate_outside_slabs() {
        assert!(input("-100").validate().is_err());
        assert!(input("29").validate().is_err());
        assert!(input("0").validate().is_ok());
        assert!(input("28").validate().is_ok());
    }

    #[test]
    fn test_variant_deserializes_with_defaults() {
        let v: Variant = serde_json::from_str(r#"{"name":"XL"}"#).unwrap();
        assert_eq!(v.stock, 0);
        assert!(v.price.is_none());
    }
}

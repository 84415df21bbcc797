//! Seed the database with a demo catalog.
//!
//! Inserts a two-level category tree, a handful of products with variants
//! and quantity-break pricing, a welcome coupon and a warehouse. Rows that
//! already exist (by slug, code or name) are left alone, so seeding twice is
//! harmless.
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `SEED_ADMIN_PHONE` - If set, this number gets an admin account

use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;

use wholesale_core::{DiscountType, Phone, UserRole};
use wholesale_storefront::db::UserRepository;
use wholesale_storefront::models::catalog::{PriceTier, Variant};

struct SeedCategory {
    name: &'static str,
    slug: &'static str,
    parent: Option<&'static str>,
    sort_order: i32,
}

const CATEGORIES: &[SeedCategory] = &[
    SeedCategory { name: "Apparel", slug: "apparel", parent: None, sort_order: 1 },
    SeedCategory { name: "T-Shirts", slug: "t-shirts", parent: Some("apparel"), sort_order: 1 },
    SeedCategory { name: "Hoodies", slug: "hoodies", parent: Some("apparel"), sort_order: 2 },
    SeedCategory { name: "Home & Kitchen", slug: "home-kitchen", parent: None, sort_order: 2 },
    SeedCategory { name: "Cookware", slug: "cookware", parent: Some("home-kitchen"), sort_order: 1 },
];

struct SeedProduct {
    name: &'static str,
    slug: &'static str,
    category: &'static str,
    price: &'static str,
    mrp: &'static str,
    moq: i32,
    stock: i32,
    weight_grams: i32,
    hsn_code: &'static str,
    gst_rate: &'static str,
    variants: &'static [(&'static str, &'static str, i32)],
    tiers: &'static [(i32, &'static str)],
}

const PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        name: "Cotton Crew Neck T-Shirt",
        slug: "cotton-crew-neck-t-shirt",
        category: "t-shirts",
        price: "149.00",
        mrp: "299.00",
        moq: 10,
        stock: 500,
        weight_grams: 180,
        hsn_code: "6109",
        gst_rate: "5",
        variants: &[("S", "TS-CREW-S", 150), ("M", "TS-CREW-M", 200), ("L", "TS-CREW-L", 150)],
        tiers: &[(50, "139.00"), (100, "129.00")],
    },
    SeedProduct {
        name: "Fleece Pullover Hoodie",
        slug: "fleece-pullover-hoodie",
        category: "hoodies",
        price: "449.00",
        mrp: "899.00",
        moq: 5,
        stock: 120,
        weight_grams: 450,
        hsn_code: "6110",
        gst_rate: "12",
        variants: &[("M", "HD-FLC-M", 60), ("L", "HD-FLC-L", 60)],
        tiers: &[(25, "419.00")],
    },
    SeedProduct {
        name: "Stainless Steel Kadai 2L",
        slug: "stainless-steel-kadai-2l",
        category: "cookware",
        price: "389.00",
        mrp: "650.00",
        moq: 6,
        stock: 80,
        weight_grams: 1200,
        hsn_code: "7323",
        gst_rate: "18",
        variants: &[],
        tiers: &[(24, "359.00"), (60, "339.00")],
    },
];

/// Run the seed.
///
/// # Errors
///
/// Returns an error if the database is unreachable or an insert fails.
pub async fn run(reset: bool) -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    let mut tx = pool.begin().await?;
    if reset {
        info!("Clearing catalog, coupon and warehouse tables");
        sqlx::query(
            "TRUNCATE cart_items, reviews, products, categories, coupons, warehouses
             RESTART IDENTITY CASCADE",
        )
        .execute(&mut *tx)
        .await?;
    }

    let categories = seed_categories(&mut tx).await?;
    let products = seed_products(&mut tx).await?;
    let coupons = seed_coupon(&mut tx).await?;
    let warehouses = seed_warehouse(&mut tx).await?;
    tx.commit().await?;

    info!(categories, products, coupons, warehouses, "Seed rows inserted");

    seed_admin(&pool).await?;

    info!("Seeding complete!");
    Ok(())
}

async fn seed_categories(tx: &mut Transaction<'_, Postgres>) -> Result<u64, sqlx::Error> {
    let mut inserted = 0;
    // Parents come first in the table, so their rows exist by the time the
    // children look them up.
    for category in CATEGORIES {
        let result = sqlx::query(
            "INSERT INTO categories (name, slug, parent_id, level, sort_order)
             SELECT $1, $2, p.id, COALESCE(p.level + 1, 0), $4
             FROM (SELECT 1) AS one
             LEFT JOIN categories p ON p.slug = $3
             ON CONFLICT (slug) DO NOTHING",
        )
        .bind(category.name)
        .bind(category.slug)
        .bind(category.parent)
        .bind(category.sort_order)
        .execute(&mut **tx)
        .await?;
        inserted += result.rows_affected();
    }
    Ok(inserted)
}

async fn seed_products(
    tx: &mut Transaction<'_, Postgres>,
) -> Result<u64, Box<dyn std::error::Error>> {
    let mut inserted = 0;
    for product in PRODUCTS {
        let variants: Vec<Variant> = product
            .variants
            .iter()
            .map(|&(name, sku, stock)| Variant {
                name: name.to_string(),
                sku: Some(sku.to_string()),
                price: None,
                mrp: None,
                stock,
            })
            .collect();
        let tiers = product
            .tiers
            .iter()
            .map(|&(min_quantity, price)| {
                Ok(PriceTier {
                    min_quantity,
                    price: Decimal::from_str(price)?,
                })
            })
            .collect::<Result<Vec<_>, rust_decimal::Error>>()?;

        let result = sqlx::query(
            "INSERT INTO products (name, slug, description, category_id, price, mrp,
                                   min_order_quantity, stock, variants, price_tiers,
                                   weight_grams, hsn_code, gst_rate)
             SELECT $1, $2, $3, c.id, $5, $6, $7, $8, $9, $10, $11, $12, $13
             FROM (SELECT 1) AS one
             LEFT JOIN categories c ON c.slug = $4
             ON CONFLICT (slug) DO NOTHING",
        )
        .bind(product.name)
        .bind(product.slug)
        .bind(format!("{} - sold in cartons, minimum {} units.", product.name, product.moq))
        .bind(product.category)
        .bind(Decimal::from_str(product.price)?)
        .bind(Decimal::from_str(product.mrp)?)
        .bind(product.moq)
        .bind(product.stock)
        .bind(Json(variants))
        .bind(Json(tiers))
        .bind(product.weight_grams)
        .bind(product.hsn_code)
        .bind(Decimal::from_str(product.gst_rate)?)
        .execute(&mut **tx)
        .await?;
        inserted += result.rows_affected();
    }
    Ok(inserted)
}

async fn seed_coupon(tx: &mut Transaction<'_, Postgres>) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO coupons (code, description, discount_type, value, min_order_value, max_discount)
         VALUES ('WELCOME10', '10% off your first wholesale order', $1, 10, 2000, 500)
         ON CONFLICT (code) DO NOTHING",
    )
    .bind(DiscountType::Percentage)
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected())
}

async fn seed_warehouse(tx: &mut Transaction<'_, Postgres>) -> Result<u64, sqlx::Error> {
    let name = std::env::var("DELHIVERY_PICKUP_LOCATION").unwrap_or_else(|_| "Main Warehouse".to_string());
    let result = sqlx::query(
        "INSERT INTO warehouses (name, phone, address, city, state, pincode)
         VALUES ($1, '9876543210', 'Plot 12, Industrial Area Phase 2', 'New Delhi', 'Delhi', '110020')
         ON CONFLICT (name) DO NOTHING",
    )
    .bind(name)
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected())
}

async fn seed_admin(pool: &PgPool) -> Result<(), Box<dyn std::error::Error>> {
    let Ok(raw) = std::env::var("SEED_ADMIN_PHONE") else {
        return Ok(());
    };
    let phone = Phone::parse(&raw)?;

    let users = UserRepository::new(pool);
    let user = users.find_or_create(&phone, Some("Store Admin")).await?;
    users.set_role(user.id, UserRole::Admin).await?;

    info!(user_id = %user.id, phone = %phone.masked(), "Admin account ready");
    Ok(())
}

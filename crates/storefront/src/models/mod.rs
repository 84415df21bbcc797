//! Domain models for the storefront API.
//!
//! Types here are what handlers and services pass around and what the API
//! serializes. Database row types stay private to the `db` modules.

pub mod address;
pub mod cart;
pub mod catalog;
pub mod coupon;
pub mod order;
pub mod session;
pub mod shipping;
pub mod user;
pub mod wallet;

pub use address::{Address, AddressInput};
pub use cart::{CartItem, CartKey, CartLine, CartSummary};
pub use catalog::{
    Category, CategoryNode, PriceTier, Product, ProductInput, RatingSummary, Review, Variant,
};
pub use coupon::{Coupon, CouponInput};
pub use order::{Order, OrderItem, Payment, ShippingAddress};
pub use session::{CurrentUser, keys as session_keys};
pub use shipping::{Shipment, Warehouse, WarehouseInput};
pub use user::{ProfileUpdate, User};
pub use wallet::WalletTransaction;

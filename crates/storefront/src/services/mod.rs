//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Phone/OTP sign-in and bearer tokens
//! - `pricing` - Cart line pricing (variants, quantity tiers, MOQ, stock)
//! - `orders` - Checkout and cancellation
//! - `payments` - Razorpay order creation, verification and webhooks
//! - `shipping` - Delhivery shipments for orders
//! - `invoice` - GST invoice figures
//! - `email` - Order confirmation email

pub mod auth;
pub mod email;
pub mod invoice;
pub mod orders;
pub mod payments;
pub mod pricing;
pub mod shipping;

//! Razorpay payment gateway integration.
//!
//! This module provides:
//! - [`RazorpayClient`] for creating gateway orders
//! - Checkout signature verification (`order_id|payment_id`)
//! - Webhook signature verification (raw body)
//! - Webhook event types
//!
//! # Flow
//!
//! 1. The API creates a Razorpay order for the order total (in paise)
//! 2. The browser completes checkout and posts the signed result to
//!    `/api/payments/verify`
//! 3. Razorpay also delivers `payment.captured` to `/api/payments/webhook`
//! 4. Whichever arrives first confirms the order; the other is a replay

mod client;
mod error;
mod types;

pub use client::RazorpayClient;
pub use error::RazorpayError;
pub use types::{PaymentEntity, RazorpayOrder, WebhookEvent};

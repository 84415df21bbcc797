//! Wholesale Core - Shared types library.
//!
//! This crate provides common types used across all wholesale storefront components:
//! - `storefront` - The JSON API consumed by the web frontend
//! - `cli` - Command-line tools for migrations, seeding and smoke tests
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money, phones, pincodes,
//!   emails, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

//! Core types for the wholesale storefront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod phone;
pub mod pincode;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::{CURRENCY, from_paise, to_paise};
pub use phone::{Phone, PhoneError};
pub use pincode::{Pincode, PincodeError};
pub use status::*;

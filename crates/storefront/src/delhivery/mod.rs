//! Delhivery logistics API integration.
//!
//! - [`DelhiveryClient`] wraps the courier's REST endpoints: pincode
//!   serviceability, manifesting and cancelling shipments, tracking, TAT and
//!   rate quotes, warehouse registration, pickups, waybills and labels
//! - Pincode lookups are cached in memory for six hours
//!
//! Every call is a single awaited request; failures surface as
//! [`DelhiveryError`] and callers decide whether they matter.

mod client;
mod error;
mod types;

pub use client::DelhiveryClient;
pub use error::DelhiveryError;
pub use types::{
    ChargesQuery, CreatedShipment, PaymentMode, PickupRequest, PincodeServiceability,
    SellerDetails, ShipmentRequest, TatQuote, TrackingInfo, TrackingScan, TransportMode,
    WarehouseRegistration,
};

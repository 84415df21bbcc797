//! Delhivery request and response types.
//!
//! Delhivery's JSON mixes naming styles (`delivery_codes`, `ShipmentData`,
//! `pre_paid`) and encodes booleans as `"Y"`/`"N"`. The raw shapes stay
//! private here; the public types are what the rest of the crate uses.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::models::{Order, WarehouseInput};
use wholesale_core::PaymentMethod;

// =============================================================================
// Pincode serviceability
// =============================================================================

/// Whether Delhivery delivers to a pincode, and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PincodeServiceability {
    pub pincode: String,
    pub serviceable: bool,
    #[serde(rename = "isCOD")]
    pub is_cod: bool,
    pub is_prepaid: bool,
    pub pickup: bool,
    /// Out-of-delivery-area; deliveries may take longer.
    pub is_oda: bool,
    pub city: Option<String>,
    pub state: Option<String>,
    pub district: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct PincodeResponse {
    #[serde(default)]
    pub delivery_codes: Vec<DeliveryCode>,
}

#[derive(Debug, Deserialize)]
pub(super) struct DeliveryCode {
    pub postal_code: PostalCode,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct PostalCode {
    pub city: Option<String>,
    pub state_code: Option<String>,
    pub district: Option<String>,
    pub cod: Option<String>,
    pub pre_paid: Option<String>,
    pub pickup: Option<String>,
    pub is_oda: Option<String>,
}

fn yes(flag: Option<&String>) -> bool {
    flag.is_some_and(|f| f.trim().eq_ignore_ascii_case("y"))
}

impl PincodeServiceability {
    /// Interpret a pincode response: an empty `delivery_codes` list means the
    /// pincode is not serviceable; otherwise flags come from the first entry.
    pub(super) fn from_response(pincode: &str, response: PincodeResponse) -> Self {
        let Some(first) = response.delivery_codes.into_iter().next() else {
            return Self::not_serviceable(pincode);
        };
        let code = first.postal_code;

        Self {
            pincode: pincode.to_string(),
            serviceable: true,
            is_cod: yes(code.cod.as_ref()),
            is_prepaid: yes(code.pre_paid.as_ref()),
            pickup: yes(code.pickup.as_ref()),
            is_oda: yes(code.is_oda.as_ref()),
            city: code.city,
            state: code.state_code,
            district: code.district,
        }
    }

    #[must_use]
    pub fn not_serviceable(pincode: &str) -> Self {
        Self {
            pincode: pincode.to_string(),
            serviceable: false,
            is_cod: false,
            is_prepaid: false,
            pickup: false,
            is_oda: false,
            city: None,
            state: None,
            district: None,
        }
    }

    /// Whether an order with this payment method can be delivered here.
    #[must_use]
    pub fn accepts(&self, method: PaymentMethod) -> bool {
        self.serviceable
            && match method {
                PaymentMethod::Cod => self.is_cod,
                PaymentMethod::Razorpay => self.is_prepaid,
            }
    }
}

// =============================================================================
// Shipments
// =============================================================================

/// Delhivery payment mode for a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMode {
    Prepaid,
    #[serde(rename = "COD")]
    Cod,
}

impl PaymentMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prepaid => "Prepaid",
            Self::Cod => "COD",
        }
    }

    /// Label used by the rate calculator (`pt` parameter).
    #[must_use]
    pub const fn charges_label(self) -> &'static str {
        match self {
            Self::Prepaid => "Pre-paid",
            Self::Cod => "COD",
        }
    }
}

/// Surface or express transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    #[default]
    #[serde(alias = "S", alias = "s")]
    Surface,
    #[serde(alias = "E", alias = "e")]
    Express,
}

impl TransportMode {
    /// Single-letter code used by TAT and rate endpoints.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Surface => "S",
            Self::Express => "E",
        }
    }

    #[must_use]
    pub const fn shipping_mode(self) -> &'static str {
        match self {
            Self::Surface => "Surface",
            Self::Express => "Express",
        }
    }
}

/// A package to manifest.
#[derive(Debug, Clone)]
pub struct ShipmentRequest {
    pub order_number: String,
    pub consignee: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub payment_mode: PaymentMode,
    /// Rupees to collect on delivery; zero for prepaid.
    pub cod_amount: rust_decimal::Decimal,
    pub total_amount: rust_decimal::Decimal,
    pub products_desc: String,
    pub quantity: i64,
    pub weight_grams: i64,
    pub pickup_location: String,
    pub transport: TransportMode,
    pub seller: Option<SellerDetails>,
}

/// Seller details printed on the shipping label.
#[derive(Debug, Clone)]
pub struct SellerDetails {
    pub name: String,
    pub address: String,
    pub gstin: Option<String>,
    pub invoice_number: Option<String>,
}

impl ShipmentRequest {
    /// Build a request from an order snapshot.
    #[must_use]
    pub fn from_order(
        order: &Order,
        pickup_location: &str,
        seller: Option<SellerDetails>,
    ) -> Self {
        let address = &order.shipping_address;
        let payment_mode = match order.payment_method {
            PaymentMethod::Cod => PaymentMode::Cod,
            PaymentMethod::Razorpay => PaymentMode::Prepaid,
        };
        let cod_amount = match payment_mode {
            PaymentMode::Cod => order.total,
            PaymentMode::Prepaid => rust_decimal::Decimal::ZERO,
        };
        let products_desc = order
            .items
            .iter()
            .map(|i| match &i.variant_name {
                Some(v) => format!("{} ({v}) x{}", i.name, i.quantity),
                None => format!("{} x{}", i.name, i.quantity),
            })
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            order_number: order.order_number.clone(),
            consignee: address.name.clone(),
            phone: address.phone.clone(),
            address: address.street(),
            city: address.city.clone(),
            state: address.state.clone(),
            pincode: address.pincode.clone(),
            payment_mode,
            cod_amount,
            total_amount: order.subtotal - order.discount + order.shipping_fee,
            products_desc,
            quantity: order.total_quantity(),
            weight_grams: order.total_weight_grams(),
            pickup_location: pickup_location.to_string(),
            transport: TransportMode::Surface,
            seller,
        }
    }

    /// The `data` JSON for `/api/cmu/create.json`.
    pub(super) fn to_payload(&self) -> serde_json::Value {
        let mut shipment = serde_json::json!({
            "name": self.consignee,
            "add": self.address,
            "pin": self.pincode,
            "city": self.city,
            "state": self.state,
            "country": "India",
            "phone": self.phone,
            "order": self.order_number,
            "payment_mode": self.payment_mode.as_str(),
            "cod_amount": self.cod_amount.to_string(),
            "total_amount": self.total_amount.to_string(),
            "products_desc": self.products_desc,
            "quantity": self.quantity.to_string(),
            "weight": self.weight_grams.to_string(),
            "shipping_mode": self.transport.shipping_mode(),
        });
        if let (Some(seller), Some(obj)) = (&self.seller, shipment.as_object_mut()) {
            obj.insert("seller_name".into(), seller.name.clone().into());
            obj.insert("seller_add".into(), seller.address.clone().into());
            if let Some(gstin) = &seller.gstin {
                obj.insert("seller_gst_tin".into(), gstin.clone().into());
            }
            if let Some(invoice) = &seller.invoice_number {
                obj.insert("seller_inv".into(), invoice.clone().into());
            }
        }

        serde_json::json!({
            "shipments": [shipment],
            "pickup_location": { "name": self.pickup_location },
        })
    }
}

/// Waybill(s) assigned to a manifested package.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedShipment {
    pub waybill: String,
    pub upload_wbn: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub upload_wbn: Option<String>,
    #[serde(default)]
    pub rmk: Option<String>,
    #[serde(default)]
    pub packages: Vec<CreatedPackage>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreatedPackage {
    #[serde(default)]
    pub waybill: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub remarks: serde_json::Value,
}

impl CreateResponse {
    /// The waybill, or the remarks Delhivery gave for rejecting the package.
    pub(super) fn into_result(self) -> Result<CreatedShipment, String> {
        let package = self.packages.into_iter().next();
        let accepted = package.as_ref().is_some_and(|p| {
            p.status
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case("success"))
        });

        if (self.success || accepted)
            && let Some(waybill) = package.as_ref().and_then(|p| p.waybill.clone())
            && !waybill.is_empty()
        {
            return Ok(CreatedShipment {
                waybill,
                upload_wbn: self.upload_wbn,
            });
        }

        let remarks = package.map(|p| remarks_text(&p.remarks)).unwrap_or_default();
        Err(if remarks.is_empty() {
            self.rmk.unwrap_or_else(|| "no waybill returned".to_string())
        } else {
            remarks
        })
    }
}

fn remarks_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("; "),
        _ => String::new(),
    }
}

// =============================================================================
// Tracking
// =============================================================================

/// Current status and scan history of a waybill.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingInfo {
    pub waybill: String,
    pub status: String,
    pub status_location: Option<String>,
    pub status_time: Option<String>,
    pub instructions: Option<String>,
    pub expected_delivery: Option<String>,
    pub reference: Option<String>,
    pub scans: Vec<TrackingScan>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingScan {
    pub status: String,
    pub time: Option<String>,
    pub location: Option<String>,
    pub instructions: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TrackResponse {
    #[serde(rename = "ShipmentData", default)]
    pub shipment_data: Vec<ShipmentDataEntry>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ShipmentDataEntry {
    #[serde(rename = "Shipment")]
    pub shipment: RawShipment,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct RawShipment {
    #[serde(rename = "AWB")]
    pub awb: Option<String>,
    pub status: Option<RawStatus>,
    #[serde(default)]
    pub scans: Vec<RawScanWrapper>,
    pub reference_no: Option<String>,
    pub expected_delivery_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct RawStatus {
    pub status: Option<String>,
    pub status_location: Option<String>,
    pub status_date_time: Option<String>,
    pub instructions: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawScanWrapper {
    #[serde(rename = "ScanDetail")]
    pub scan_detail: RawScan,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct RawScan {
    pub scan: Option<String>,
    pub scan_date_time: Option<String>,
    pub scanned_location: Option<String>,
    pub instructions: Option<String>,
}

impl TrackResponse {
    pub(super) fn into_info(self, waybill: &str) -> Option<TrackingInfo> {
        let shipment = self.shipment_data.into_iter().next()?.shipment;
        let status = shipment.status;
        Some(TrackingInfo {
            waybill: shipment.awb.unwrap_or_else(|| waybill.to_string()),
            status: status
                .as_ref()
                .and_then(|s| s.status.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            status_location: status.as_ref().and_then(|s| s.status_location.clone()),
            status_time: status.as_ref().and_then(|s| s.status_date_time.clone()),
            instructions: status.and_then(|s| s.instructions),
            expected_delivery: shipment.expected_delivery_date,
            reference: shipment.reference_no,
            scans: shipment
                .scans
                .into_iter()
                .map(|w| TrackingScan {
                    status: w.scan_detail.scan.unwrap_or_default(),
                    time: w.scan_detail.scan_date_time,
                    location: w.scan_detail.scanned_location,
                    instructions: w.scan_detail.instructions,
                })
                .collect(),
        })
    }
}

// =============================================================================
// Quotes
// =============================================================================

/// Expected transit time between two pincodes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TatQuote {
    pub origin: String,
    pub destination: String,
    pub mode: TransportMode,
    pub tat_days: Option<i64>,
    pub raw: serde_json::Value,
}

/// Parameters for the rate calculator.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargesQuery {
    pub origin: String,
    pub destination: String,
    pub weight_grams: i64,
    #[serde(default)]
    pub mode: TransportMode,
    #[serde(default = "default_payment_mode")]
    pub payment_mode: PaymentMode,
}

const fn default_payment_mode() -> PaymentMode {
    PaymentMode::Prepaid
}

// =============================================================================
// Warehouses and pickups
// =============================================================================

/// Warehouse fields sent to the client-warehouse endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct WarehouseRegistration {
    pub name: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub address: String,
    pub city: String,
    pub pin: String,
    pub country: &'static str,
    pub return_address: String,
    pub return_city: String,
    pub return_state: String,
    pub return_pin: String,
    pub return_country: &'static str,
}

impl From<&WarehouseInput> for WarehouseRegistration {
    /// Return fields default to the pickup address.
    fn from(w: &WarehouseInput) -> Self {
        Self {
            name: w.name.trim().to_string(),
            phone: w.phone.to_string(),
            email: w.email.clone(),
            address: w.address.clone(),
            city: w.city.clone(),
            pin: w.pincode.to_string(),
            country: "India",
            return_address: w.return_address.clone().unwrap_or_else(|| w.address.clone()),
            return_city: w.return_city.clone().unwrap_or_else(|| w.city.clone()),
            return_state: w.return_state.clone().unwrap_or_else(|| w.state.clone()),
            return_pin: w
                .return_pincode
                .as_ref()
                .unwrap_or(&w.pincode)
                .to_string(),
            return_country: "India",
        }
    }
}

/// A pickup request for packages waiting at a warehouse.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickupRequest {
    pub pickup_location: String,
    pub pickup_date: NaiveDate,
    pub pickup_time: NaiveTime,
    pub expected_package_count: u32,
}

impl PickupRequest {
    pub(super) fn to_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "pickup_location": self.pickup_location,
            "pickup_date": self.pickup_date.format("%Y-%m-%d").to_string(),
            "pickup_time": self.pickup_time.format("%H:%M:%S").to_string(),
            "expected_package_count": self.expected_package_count,
        })
    }
}

/// Parse the bulk waybill response, which is either a comma-separated
/// string or a JSON array.
pub(super) fn parse_waybills(value: &serde_json::Value) -> Vec<String> {
    match value {
        serde_json::Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|v| match v {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::order::tests::sample_order;

    #[test]
    fn test_empty_delivery_codes_not_serviceable() {
        let response: PincodeResponse = serde_json::from_str(r#"{"delivery_codes": []}"#).unwrap();
        let result = PincodeServiceability::from_response("999999", response);
        assert!(!result.serviceable);
        assert!(!result.is_cod);
        assert!(!result.accepts(PaymentMethod::Razorpay));
    }

    #[test]
    fn test_serviceable_flags_from_first_entry() {
        let response: PincodeResponse = serde_json::from_str(
            r#"{"delivery_codes": [
                {"postal_code": {"pin": 110001, "city": "New Delhi", "state_code": "DL",
                                 "district": "New Delhi", "cod": "Y", "pre_paid": "Y",
                                 "pickup": "N", "is_oda": "N"}},
                {"postal_code": {"pin": 110001, "cod": "N", "pre_paid": "N"}}
            ]}"#,
        )
        .unwrap();
        let result = PincodeServiceability::from_response("110001", response);
        assert!(result.serviceable);
        assert!(result.is_cod);
        assert!(result.is_prepaid);
        assert!(!result.pickup);
        assert_eq!(result.city.as_deref(), Some("New Delhi"));
        assert!(result.accepts(PaymentMethod::Cod));
    }

    #[test]
    fn test_prepaid_only_rejects_cod() {
        let response: PincodeResponse = serde_json::from_str(
            r#"{"delivery_codes": [{"postal_code": {"cod": "N", "pre_paid": "Y"}}]}"#,
        )
        .unwrap();
        let result = PincodeServiceability::from_response("400001", response);
        assert!(!result.accepts(PaymentMethod::Cod));
        assert!(result.accepts(PaymentMethod::Razorpay));
    }

    #[test]
    fn test_serviceability_json_uses_is_cod_key() {
        let json = serde_json::to_value(PincodeServiceability::not_serviceable("110001")).unwrap();
        assert_eq!(json["isCOD"], false);
        assert_eq!(json["isPrepaid"], false);
    }

    #[test]
    fn test_create_response_success() {
        let response: CreateResponse = serde_json::from_str(
            r#"{"success": true, "upload_wbn": "UPL123",
                "packages": [{"status": "Success", "waybill": "1490810000012", "remarks": []}]}"#,
        )
        .unwrap();
        let created = response.into_result().unwrap();
        assert_eq!(created.waybill, "1490810000012");
        assert_eq!(created.upload_wbn.as_deref(), Some("UPL123"));
    }

    #[test]
    fn test_create_response_failure_returns_remarks() {
        let response: CreateResponse = serde_json::from_str(
            r#"{"success": false, "rmk": "An internal Error has occurred",
                "packages": [{"status": "Fail", "waybill": "",
                              "remarks": ["Crashing while saving package", "NSZ"]}]}"#,
        )
        .unwrap();
        assert_eq!(
            response.into_result().unwrap_err(),
            "Crashing while saving package; NSZ"
        );
    }

    #[test]
    fn test_track_response() {
        let response: TrackResponse = serde_json::from_str(
            r#"{"ShipmentData": [{"Shipment": {
                "AWB": "1490810000012",
                "ReferenceNo": "WH260301ABCDEF",
                "Status": {"Status": "In Transit", "StatusLocation": "Pune_Hub",
                           "StatusDateTime": "2026-03-02T10:15:00", "Instructions": "Shipment picked up"},
                "Scans": [{"ScanDetail": {"Scan": "Manifested", "ScanDateTime": "2026-03-01T18:00:00",
                                          "ScannedLocation": "Delhi_Warehouse"}}]
            }}]}"#,
        )
        .unwrap();
        let info = response.into_info("1490810000012").unwrap();
        assert_eq!(info.status, "In Transit");
        assert_eq!(info.scans.len(), 1);
        assert_eq!(info.reference.as_deref(), Some("WH260301ABCDEF"));
    }

    #[test]
    fn test_track_response_empty() {
        let response: TrackResponse = serde_json::from_str(r#"{"ShipmentData": []}"#).unwrap();
        assert!(response.into_info("1").is_none());
    }

    #[test]
    fn test_shipment_payload_from_prepaid_order() {
        let order = sample_order();
        let request = ShipmentRequest::from_order(&order, "Main Warehouse", None);
        let payload = request.to_payload();

        let shipment = &payload["shipments"][0];
        assert_eq!(shipment["payment_mode"], "Prepaid");
        assert_eq!(shipment["cod_amount"], "0");
        assert_eq!(shipment["pin"], "411001");
        assert_eq!(shipment["weight"], "2000");
        assert_eq!(payload["pickup_location"]["name"], "Main Warehouse");
    }

    #[test]
    fn test_shipment_payload_cod_collects_total() {
        let mut order = sample_order();
        order.payment_method = PaymentMethod::Cod;
        let request = ShipmentRequest::from_order(&order, "Main Warehouse", None);
        assert_eq!(request.payment_mode, PaymentMode::Cod);
        assert_eq!(request.cod_amount, order.total);
    }

    #[test]
    fn test_parse_waybills() {
        assert_eq!(
            parse_waybills(&serde_json::json!("111, 222,333")),
            vec!["111", "222", "333"]
        );
        assert_eq!(
            parse_waybills(&serde_json::json!(["444", 555])),
            vec!["444", "555"]
        );
        assert!(parse_waybills(&serde_json::json!({"error": "x"})).is_empty());
    }

    #[test]
    fn test_transport_mode_aliases() {
        let mode: TransportMode = serde_json::from_str("\"E\"").unwrap();
        assert_eq!(mode, TransportMode::Express);
        assert_eq!(TransportMode::default().code(), "S");
    }

    #[test]
    fn test_warehouse_return_address_defaults_to_pickup() {
        let input: WarehouseInput = serde_json::from_value(serde_json::json!({
            "name": " Pune Main ",
            "phone": "+91 98765 43210",
            "address": "12 Market Yard",
            "city": "Pune",
            "state": "Maharashtra",
            "pincode": "411037"
        }))
        .unwrap();

        let registration = WarehouseRegistration::from(&input);
        assert_eq!(registration.name, "Pune Main");
        assert_eq!(registration.phone, "9876543210");
        assert_eq!(registration.return_pin, "411037");
        assert_eq!(registration.return_state, "Maharashtra");
    }
}

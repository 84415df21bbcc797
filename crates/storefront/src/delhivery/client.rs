//! Delhivery One REST client.
//!
//! Pincode lookups are cached for six hours; serviceability changes rarely
//! and checkout asks for the same pincode repeatedly.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument, warn};

use super::error::DelhiveryError;
use super::types::{
    ChargesQuery, CreateResponse, CreatedShipment, PickupRequest, PincodeResponse,
    PincodeServiceability, ShipmentRequest, TatQuote, TrackResponse, TrackingInfo, TransportMode,
    WarehouseRegistration, parse_waybills,
};
use crate::config::DelhiveryConfig;

const PINCODE_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Delhivery API client.
#[derive(Clone)]
pub struct DelhiveryClient {
    inner: Arc<DelhiveryClientInner>,
}

struct DelhiveryClientInner {
    client: reqwest::Client,
    api_url: String,
    track_api_url: String,
    token: SecretString,
    pincodes: Cache<String, PincodeServiceability>,
}

impl std::fmt::Debug for DelhiveryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelhiveryClient")
            .field("api_url", &self.inner.api_url)
            .field("track_api_url", &self.inner.track_api_url)
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Truncate a response body for logs and error messages.
fn snippet(body: &str) -> String {
    body.chars().take(300).collect()
}

impl DelhiveryClient {
    /// Create a new Delhivery client.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created.
    #[must_use]
    pub fn new(config: &DelhiveryConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        let pincodes = Cache::builder()
            .max_capacity(5000)
            .time_to_live(PINCODE_TTL)
            .build();

        Self {
            inner: Arc::new(DelhiveryClientInner {
                client,
                api_url: config.api_url.trim_end_matches('/').to_string(),
                track_api_url: config.track_api_url.trim_end_matches('/').to_string(),
                token: config.token.clone(),
                pincodes,
            }),
        }
    }

    fn auth_header(&self) -> String {
        format!("Token {}", self.inner.token.expose_secret())
    }

    /// Send a request and return the body text, mapping non-2xx to `Api`.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, DelhiveryError> {
        let response = request
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!(
                status = %status,
                body = %snippet(&body),
                "Delhivery API returned non-success status"
            );
            return Err(DelhiveryError::Api {
                status: status.as_u16(),
                message: snippet(&body),
            });
        }

        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, DelhiveryError> {
        let body = self.send(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            error!(error = %e, body = %snippet(&body), "Failed to parse Delhivery response");
            DelhiveryError::Parse(e.to_string())
        })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.inner
            .client
            .get(format!("{}{path}", self.inner.api_url))
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.inner
            .client
            .post(format!("{}{path}", self.inner.api_url))
    }

    // =========================================================================
    // Serviceability and quotes
    // =========================================================================

    /// Check whether a pincode is serviceable.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails. An unknown pincode is not
    /// an error; it comes back with `serviceable: false`.
    #[instrument(skip(self))]
    pub async fn check_pincode(&self, pincode: &str) -> Result<PincodeServiceability, DelhiveryError> {
        if let Some(cached) = self.inner.pincodes.get(pincode).await {
            debug!("Cache hit for pincode");
            return Ok(cached);
        }

        let response: PincodeResponse = self
            .send_json(
                self.get("/c/api/pin-codes/json/")
                    .query(&[("filter_codes", pincode)]),
            )
            .await?;
        let result = PincodeServiceability::from_response(pincode, response);

        self.inner
            .pincodes
            .insert(pincode.to_string(), result.clone())
            .await;

        Ok(result)
    }

    /// Expected transit time in days between two pincodes.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn expected_tat(
        &self,
        origin: &str,
        destination: &str,
        mode: TransportMode,
    ) -> Result<TatQuote, DelhiveryError> {
        let raw: serde_json::Value = self
            .send_json(self.get("/api/dc/expected_tat").query(&[
                ("origin_pin", origin),
                ("destination_pin", destination),
                ("mot", mode.code()),
                ("pdt", "B2C"),
            ]))
            .await?;

        let tat_days = raw
            .pointer("/data/tat")
            .or_else(|| raw.get("tat"))
            .and_then(|v| v.as_i64().or_else(|| v.as_str().and_then(|s| s.parse().ok())));

        Ok(TatQuote {
            origin: origin.to_string(),
            destination: destination.to_string(),
            mode,
            tat_days,
            raw,
        })
    }

    /// Shipping cost estimate from the rate calculator.
    ///
    /// The response is passed through as Delhivery returns it.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn shipping_charges(
        &self,
        query: &ChargesQuery,
    ) -> Result<serde_json::Value, DelhiveryError> {
        let weight = query.weight_grams.to_string();
        self.send_json(self.get("/api/kinko/v1/invoice/charges/.json").query(&[
            ("md", query.mode.code()),
            ("ss", "Delivered"),
            ("o_pin", query.origin.as_str()),
            ("d_pin", query.destination.as_str()),
            ("cgm", weight.as_str()),
            ("pt", query.payment_mode.charges_label()),
        ]))
        .await
    }

    // =========================================================================
    // Shipments
    // =========================================================================

    /// Manifest a package and get its waybill.
    ///
    /// # Errors
    ///
    /// Returns `DelhiveryError::Rejected` with Delhivery's remarks if the
    /// package was not accepted, or an HTTP/API error.
    #[instrument(skip(self, request), fields(order_number = %request.order_number))]
    pub async fn create_shipment(
        &self,
        request: &ShipmentRequest,
    ) -> Result<CreatedShipment, DelhiveryError> {
        let data = request.to_payload().to_string();
        let response: CreateResponse = self
            .send_json(
                self.post("/api/cmu/create.json")
                    .form(&[("format", "json"), ("data", data.as_str())]),
            )
            .await?;

        match response.into_result() {
            Ok(created) => {
                debug!(waybill = %created.waybill, "Shipment manifested");
                Ok(created)
            }
            Err(remarks) => {
                warn!(%remarks, "Delhivery rejected shipment");
                Err(DelhiveryError::Rejected(remarks))
            }
        }
    }

    /// Cancel a manifested shipment.
    ///
    /// # Errors
    ///
    /// Returns `DelhiveryError::Rejected` if Delhivery refuses the
    /// cancellation, or an HTTP/API error.
    #[instrument(skip(self))]
    pub async fn cancel_shipment(&self, waybill: &str) -> Result<serde_json::Value, DelhiveryError> {
        let response: serde_json::Value = self
            .send_json(self.post("/api/p/edit").json(&serde_json::json!({
                "waybill": waybill,
                "cancellation": "true",
            })))
            .await?;

        let ok = response
            .get("status")
            .is_some_and(|s| s.as_bool() == Some(true) || s.as_str() == Some("true"));
        if !ok {
            let remark = response
                .get("remark")
                .or_else(|| response.get("error"))
                .and_then(|v| v.as_str())
                .unwrap_or("cancellation refused")
                .to_string();
            return Err(DelhiveryError::Rejected(remark));
        }

        Ok(response)
    }

    /// Current status and scan history of a waybill.
    ///
    /// # Errors
    ///
    /// Returns `DelhiveryError::WaybillNotFound` if Delhivery has no record
    /// of the waybill, or an HTTP/API error.
    #[instrument(skip(self))]
    pub async fn track(&self, waybill: &str) -> Result<TrackingInfo, DelhiveryError> {
        let request = self
            .inner
            .client
            .get(format!("{}/api/v1/packages/json/", self.inner.track_api_url))
            .query(&[("waybill", waybill)]);
        let response: TrackResponse = self.send_json(request).await?;

        response
            .into_info(waybill)
            .ok_or_else(|| DelhiveryError::WaybillNotFound(waybill.to_string()))
    }

    /// Reserve `count` waybill numbers in advance.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn fetch_waybills(&self, count: u32) -> Result<Vec<String>, DelhiveryError> {
        let count = count.to_string();
        let raw: serde_json::Value = self
            .send_json(
                self.get("/waybill/api/bulk/json/")
                    .query(&[("count", count.as_str())]),
            )
            .await?;
        Ok(parse_waybills(&raw))
    }

    /// Label data for one or more waybills, comma-separated.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn packing_slip(&self, waybills: &str) -> Result<serde_json::Value, DelhiveryError> {
        self.send_json(
            self.get("/api/p/packing_slip")
                .query(&[("wbns", waybills), ("pdf", "true")]),
        )
        .await
    }

    /// Fetch a shipment document (e.g. `SIGNATURE_URL`, `RVP_QC_IMAGE`).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn document(
        &self,
        doc_type: &str,
        waybill: &str,
    ) -> Result<serde_json::Value, DelhiveryError> {
        self.send_json(
            self.get("/api/rest/fetch/pkg/document/")
                .query(&[("doc_type", doc_type), ("waybill", waybill)]),
        )
        .await
    }

    // =========================================================================
    // Warehouses and pickups
    // =========================================================================

    /// Register a pickup warehouse.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or Delhivery rejects it.
    #[instrument(skip(self, warehouse), fields(name = %warehouse.name))]
    pub async fn create_warehouse(
        &self,
        warehouse: &WarehouseRegistration,
    ) -> Result<serde_json::Value, DelhiveryError> {
        let response: serde_json::Value = self
            .send_json(self.post("/api/backend/clientwarehouse/create/").json(warehouse))
            .await?;
        ensure_success(response)
    }

    /// Update a registered warehouse; matched by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or Delhivery rejects it.
    #[instrument(skip(self, warehouse), fields(name = %warehouse.name))]
    pub async fn update_warehouse(
        &self,
        warehouse: &WarehouseRegistration,
    ) -> Result<serde_json::Value, DelhiveryError> {
        let response: serde_json::Value = self
            .send_json(self.post("/api/backend/clientwarehouse/edit/").json(warehouse))
            .await?;
        ensure_success(response)
    }

    /// Schedule a pickup.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, request), fields(location = %request.pickup_location))]
    pub async fn create_pickup_request(
        &self,
        request: &PickupRequest,
    ) -> Result<serde_json::Value, DelhiveryError> {
        self.send_json(self.post("/fm/request/new/").json(&request.to_payload()))
            .await
    }
}

/// Warehouse endpoints answer 200 with `success: false` on validation errors.
fn ensure_success(response: serde_json::Value) -> Result<serde_json::Value, DelhiveryError> {
    if response.get("success").and_then(serde_json::Value::as_bool) == Some(false) {
        let message = response
            .get("error")
            .map(|e| match e {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| "request rejected".to_string());
        return Err(DelhiveryError::Rejected(message));
    }
    Ok(response)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> DelhiveryClient {
        DelhiveryClient::new(&DelhiveryConfig {
            token: SecretString::from("test-token"),
            api_url: "https://staging-express.delhivery.com/".to_string(),
            track_api_url: "https://track.delhivery.com".to_string(),
            pickup_location: None,
            origin_pincode: None,
            auto_ship: false,
        })
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", client());
        assert!(!debug.contains("test-token"));
        assert!(debug.contains("staging-express"));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        assert_eq!(
            client().inner.api_url,
            "https://staging-express.delhivery.com"
        );
    }

    #[test]
    fn test_ensure_success() {
        assert!(ensure_success(serde_json::json!({"success": true})).is_ok());
        let err = ensure_success(serde_json::json!({"success": false, "error": "duplicate name"}))
            .unwrap_err();
        assert!(matches!(err, DelhiveryError::Rejected(m) if m == "duplicate name"));
    }

    #[tokio::test]
    async fn test_cached_pincode_skips_network() {
        let client = client();
        let cached = PincodeServiceability::not_serviceable("110001");
        client
            .inner
            .pincodes
            .insert("110001".to_string(), cached.clone())
            .await;
        assert_eq!(client.check_pincode("110001").await.unwrap(), cached);
    }
}

//! HTTP client for the shipping partner.

use async_trait::async_trait;
use domain::{Money, PickupAddress, ShipmentDraft};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::shipping::{QuoteRequest, ShippingError, ShippingQuote, ShippingService};

/// Configuration for connecting to the shipping partner.
#[derive(Debug, Clone)]
pub struct HttpShippingConfig {
    /// Partner base URL, e.g. `"https://partner.example.com"`.
    pub base_url: String,

    /// API token sent in the `Token` header.
    pub token: String,

    /// Origin of every parcel.
    pub pickup: PickupAddress,
}

/// Shipping partner client over HTTP.
#[derive(Debug, Clone)]
pub struct HttpShippingClient {
    config: HttpShippingConfig,
    http: Client,
}

impl HttpShippingClient {
    /// Create a new client from the given configuration.
    #[must_use]
    pub fn new(config: HttpShippingConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[derive(Debug, Serialize)]
struct FeeQuery<'a> {
    pick_province: &'a str,
    pick_district: &'a str,
    province: &'a str,
    district: &'a str,
    ward: &'a str,
    street: &'a str,
    address: &'a str,
    /// Grams.
    weight: i64,
    value: i64,
    deliver_option: &'a str,
}

#[derive(Debug, Deserialize)]
struct FeeResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    fee: Option<FeeData>,
}

#[derive(Debug, Deserialize)]
struct FeeData {
    fee: i64,
    #[serde(default)]
    insurance_fee: i64,
    #[serde(default)]
    delivery: bool,
}

#[derive(Debug, Serialize)]
struct CreateShipmentBody<'a> {
    #[serde(flatten)]
    draft: &'a ShipmentDraft,
    weight_option: &'static str,
}

#[derive(Debug, Deserialize)]
struct CreateShipmentResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    order: Option<CreatedShipment>,
}

#[derive(Debug, Deserialize)]
struct CreatedShipment {
    label: String,
}

#[async_trait]
impl ShippingService for HttpShippingClient {
    #[tracing::instrument(skip(self, request), fields(province = %request.destination.province))]
    async fn quote(&self, request: &QuoteRequest) -> Result<ShippingQuote, ShippingError> {
        let destination = &request.destination;
        let query = FeeQuery {
            pick_province: &self.config.pickup.province,
            pick_district: &self.config.pickup.district,
            province: &destination.province,
            district: &destination.district,
            ward: &destination.ward,
            street: &destination.street,
            address: &destination.address,
            weight: (request.weight_kg * 1000.0).round() as i64,
            value: request.value.amount(),
            deliver_option: request.deliver_option.as_str(),
        };

        let response = self
            .http
            .get(self.url("/services/shipment/fee"))
            .header("Token", &self.config.token)
            .query(&query)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            return Err(ShippingError::Rejected(format!(
                "fee request failed with status {status}: {text}"
            )));
        }

        let parsed: FeeResponse = response.json().await?;
        match parsed.fee {
            Some(fee) if parsed.success => {
                tracing::debug!(fee = fee.fee, deliverable = fee.delivery, "received fee quote");
                Ok(ShippingQuote {
                    fee: Money::new(fee.fee),
                    insurance_fee: Money::new(fee.insurance_fee),
                    deliverable: fee.delivery,
                })
            }
            _ => Err(ShippingError::Rejected(
                parsed.message.unwrap_or_else(|| "no fee in response".to_string()),
            )),
        }
    }

    #[tracing::instrument(skip(self, draft), fields(order_id = %draft.order.id))]
    async fn create_shipment(&self, draft: &ShipmentDraft) -> Result<String, ShippingError> {
        // Product weights in the draft are kilograms.
        let body = CreateShipmentBody {
            draft,
            weight_option: "kilogram",
        };

        let response = self
            .http
            .post(self.url("/services/shipment/order"))
            .header("Token", &self.config.token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            return Err(ShippingError::Rejected(format!(
                "shipment request failed with status {status}: {text}"
            )));
        }

        let parsed: CreateShipmentResponse = response.json().await?;
        match parsed.order {
            Some(order) if parsed.success => Ok(order.label),
            _ => Err(ShippingError::Rejected(
                parsed
                    .message
                    .unwrap_or_else(|| "no shipment in response".to_string()),
            )),
        }
    }
}

//! Shipping fee quote endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use checkout::{QuoteRequest, ShippingQuote};
use domain::{DeliveryOption, Destination, Money};
use serde::Deserialize;
use store::CommerceStore;

use crate::AppState;
use crate::error::ApiError;

/// Query string of `GET /shipping/fee`.
#[derive(Debug, Deserialize)]
pub struct FeeQuery {
    pub province: String,
    pub district: String,
    #[serde(default)]
    pub ward: String,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub address: String,
    /// Parcel weight in kilograms.
    pub weight: f64,
    /// Declared value.
    #[serde(default)]
    pub value: i64,
    #[serde(default)]
    pub deliver_option: DeliveryOption,
}

impl FeeQuery {
    fn into_request(self) -> Result<QuoteRequest, ApiError> {
        if !self.weight.is_finite() || self.weight <= 0.0 {
            return Err(ApiError::BadRequest(format!(
                "weight must be positive: {}",
                self.weight
            )));
        }

        Ok(QuoteRequest {
            destination: Destination {
                province: self.province,
                district: self.district,
                ward: self.ward,
                street: self.street,
                address: self.address,
            },
            weight_kg: self.weight,
            value: Money::new(self.value.max(0)),
            deliver_option: self.deliver_option,
        })
    }
}

/// GET /shipping/fee: ask the shipping partner for a delivery fee.
#[tracing::instrument(skip(state, query))]
pub async fn fee<S: CommerceStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    query: Result<Query<FeeQuery>, QueryRejection>,
) -> Result<Json<ShippingQuote>, ApiError> {
    let Query(query) = query?;
    let request = query.into_request()?;

    Ok(Json(state.orchestrator.quote_shipping(&request).await?))
}

//! Shipping fee resolver trait and local implementations.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{DeliveryOption, Destination, Money, ShipmentDraft};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by shipping partners.
#[derive(Debug, Error)]
pub enum ShippingError {
    /// The partner could not be reached or returned garbage.
    #[error("Shipping partner request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The partner answered but refused the request.
    #[error("Shipping partner rejected the request: {0}")]
    Rejected(String),

    /// The partner is unavailable.
    #[error("Shipping partner unavailable")]
    Unavailable,
}

/// Parameters of a fee quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub destination: Destination,
    pub weight_kg: f64,
    /// Declared parcel value, used for insurance.
    pub value: Money,
    #[serde(default)]
    pub deliver_option: DeliveryOption,
}

/// A partner's answer to a quote request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingQuote {
    pub fee: Money,
    pub insurance_fee: Money,
    /// False when the partner does not serve the destination.
    pub deliverable: bool,
}

/// Trait for shipping partner operations.
#[async_trait]
pub trait ShippingService: Send + Sync {
    /// Quotes the delivery fee for a parcel.
    async fn quote(&self, request: &QuoteRequest) -> Result<ShippingQuote, ShippingError>;

    /// Books a shipment and returns the partner's id for it.
    async fn create_shipment(&self, draft: &ShipmentDraft) -> Result<String, ShippingError>;
}

#[async_trait]
impl<T: ShippingService + ?Sized> ShippingService for Arc<T> {
    async fn quote(&self, request: &QuoteRequest) -> Result<ShippingQuote, ShippingError> {
        (**self).quote(request).await
    }

    async fn create_shipment(&self, draft: &ShipmentDraft) -> Result<String, ShippingError> {
        (**self).create_shipment(draft).await
    }
}

/// Quotes one fixed fee everywhere and books nothing remotely.
#[derive(Debug, Clone)]
pub struct FlatRateShipping {
    fee: Money,
}

impl FlatRateShipping {
    pub fn new(fee: Money) -> Self {
        Self { fee }
    }
}

#[async_trait]
impl ShippingService for FlatRateShipping {
    async fn quote(&self, _request: &QuoteRequest) -> Result<ShippingQuote, ShippingError> {
        Ok(ShippingQuote {
            fee: self.fee,
            insurance_fee: Money::zero(),
            deliverable: true,
        })
    }

    async fn create_shipment(&self, draft: &ShipmentDraft) -> Result<String, ShippingError> {
        Ok(format!("LOCAL-{}", draft.order.id))
    }
}

#[derive(Debug, Default)]
struct InMemoryShippingState {
    fee: Money,
    deliverable: bool,
    quotes: Vec<QuoteRequest>,
    shipments: Vec<ShipmentDraft>,
    next_id: u32,
    fail_on_quote: bool,
    fail_on_create: bool,
}

/// In-memory shipping service for testing.
#[derive(Debug, Clone)]
pub struct InMemoryShippingService {
    state: Arc<RwLock<InMemoryShippingState>>,
}

impl Default for InMemoryShippingService {
    fn default() -> Self {
        Self::with_fee(Money::thousands(30))
    }
}

impl InMemoryShippingService {
    /// Creates a service that quotes 30,000 for every deliverable parcel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a service that quotes `fee` for every deliverable parcel.
    pub fn with_fee(fee: Money) -> Self {
        Self {
            state: Arc::new(RwLock::new(InMemoryShippingState {
                fee,
                deliverable: true,
                ..Default::default()
            })),
        }
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, InMemoryShippingState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, InMemoryShippingState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Configures quotes to fail.
    pub fn set_fail_on_quote(&self, fail: bool) {
        self.write().fail_on_quote = fail;
    }

    /// Configures bookings to fail.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.write().fail_on_create = fail;
    }

    /// Configures whether destinations are served.
    pub fn set_deliverable(&self, deliverable: bool) {
        self.write().deliverable = deliverable;
    }

    /// Returns the number of quotes requested.
    pub fn quote_count(&self) -> usize {
        self.read().quotes.len()
    }

    /// Returns the shipments booked so far.
    pub fn shipments(&self) -> Vec<ShipmentDraft> {
        self.read().shipments.clone()
    }
}

#[async_trait]
impl ShippingService for InMemoryShippingService {
    async fn quote(&self, request: &QuoteRequest) -> Result<ShippingQuote, ShippingError> {
        let mut state = self.write();
        state.quotes.push(request.clone());

        if state.fail_on_quote {
            return Err(ShippingError::Unavailable);
        }

        Ok(ShippingQuote {
            fee: state.fee,
            insurance_fee: Money::zero(),
            deliverable: state.deliverable,
        })
    }

    async fn create_shipment(&self, draft: &ShipmentDraft) -> Result<String, ShippingError> {
        let mut state = self.write();

        if state.fail_on_create {
            return Err(ShippingError::Unavailable);
        }

        state.next_id += 1;
        let partner_id = format!("SHIP-{:04}", state.next_id);
        state.shipments.push(draft.clone());

        Ok(partner_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> QuoteRequest {
        QuoteRequest {
            destination: Destination::default(),
            weight_kg: 0.5,
            value: Money::new(1_000_000),
            deliver_option: DeliveryOption::None,
        }
    }

    #[tokio::test]
    async fn test_flat_rate_quote() {
        let service = FlatRateShipping::new(Money::thousands(30));
        let quote = service.quote(&request()).await.unwrap();
        assert_eq!(quote.fee, Money::new(30_000));
        assert!(quote.deliverable);
    }

    #[tokio::test]
    async fn test_in_memory_records_quotes() {
        let service = InMemoryShippingService::with_fee(Money::new(45_000));
        let quote = service.quote(&request()).await.unwrap();
        assert_eq!(quote.fee, Money::new(45_000));
        assert_eq!(service.quote_count(), 1);
    }

    #[tokio::test]
    async fn test_fail_on_quote() {
        let service = InMemoryShippingService::new();
        service.set_fail_on_quote(true);
        assert!(matches!(
            service.quote(&request()).await,
            Err(ShippingError::Unavailable)
        ));
    }

    #[tokio::test]
    async fn test_shared_service_delegates() {
        let inner = InMemoryShippingService::new();
        let shared: Arc<dyn ShippingService> = Arc::new(inner.clone());
        shared.quote(&request()).await.unwrap();
        assert_eq!(inner.quote_count(), 1);
    }
}

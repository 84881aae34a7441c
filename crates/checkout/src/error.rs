//! Checkout error types.

use common::{OrderId, ProductId, UserId};
use domain::{DomainError, PromotionRejection};
use store::StoreError;
use thiserror::Error;

use crate::services::ShippingError;

/// Errors that can occur while placing or updating an order.
///
/// Every variant except `Store` and `Shipping` is a business rejection that
/// is shown to the caller as-is.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The request failed validation.
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] DomainError),

    /// A line references a missing, inactive or deleted product, or asks for
    /// more than is in stock.
    #[error("Product {0} is unavailable or out of stock")]
    ProductUnavailable(ProductId),

    /// The requested point spend exceeds the buyer's balance.
    #[error("Insufficient points: requested {requested}, available {available}")]
    InsufficientPoints { requested: i64, available: i64 },

    /// The requested point spend is below the accepted minimum.
    #[error("At least {minimum} points must be redeemed, requested {requested}")]
    PointRedemptionBelowMinimum { requested: i64, minimum: i64 },

    /// The authenticated buyer does not exist.
    #[error("Buyer not found: {0}")]
    BuyerNotFound(UserId),

    /// No usable promotion has this code.
    #[error("Promotion not found: {0}")]
    PromotionNotFound(String),

    /// The promotion has expired.
    #[error("Promotion expired: {0}")]
    PromotionExpired(String),

    /// The promotion has reached its usage limit.
    #[error("Promotion has reached its maximum number of uses: {0}")]
    PromotionExhausted(String),

    /// The shipping partner cannot deliver to the destination.
    #[error("The shipping partner cannot deliver to this address")]
    Undeliverable,

    /// No order has this id.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The shipping partner could not be reached.
    #[error("Shipping error: {0}")]
    Shipping(#[from] ShippingError),

    /// A persistence error occurred.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl CheckoutError {
    /// Maps a promotion rejection to the error for `code`.
    pub fn from_rejection(rejection: PromotionRejection, code: &str) -> Self {
        let code = code.to_string();
        match rejection {
            PromotionRejection::NotFound => CheckoutError::PromotionNotFound(code),
            PromotionRejection::Expired => CheckoutError::PromotionExpired(code),
            PromotionRejection::Exhausted => CheckoutError::PromotionExhausted(code),
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            CheckoutError::ProductUnavailable(_) => "order-001",
            CheckoutError::OrderNotFound(_) => "order-002",
            CheckoutError::InsufficientPoints { .. } => "order-003",
            CheckoutError::PointRedemptionBelowMinimum { .. } => "order-004",
            CheckoutError::BuyerNotFound(_) => "order-005",
            CheckoutError::Undeliverable => "order-006",
            CheckoutError::InvalidRequest(_) => "order-007",
            CheckoutError::PromotionNotFound(_) => "promotion-001",
            CheckoutError::PromotionExpired(_) => "promotion-002",
            CheckoutError::PromotionExhausted(_) => "promotion-003",
            CheckoutError::Shipping(_) | CheckoutError::Store(_) => "internal-error",
        }
    }

    /// Returns true for failures caused by infrastructure rather than the
    /// request.
    pub fn is_internal(&self) -> bool {
        matches!(self, CheckoutError::Shipping(_) | CheckoutError::Store(_))
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;

//! Domain error types.

use common::ProductId;
use thiserror::Error;

/// Validation failures for incoming commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// A required text field is empty.
    #[error("Field '{0}' is required")]
    MissingField(&'static str),

    /// The email address is not plausible.
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    /// The order has no lines.
    #[error("Order has no products")]
    EmptyOrder,

    /// A line quantity is zero or negative.
    #[error("Invalid quantity {quantity} for product {product_id} (must be greater than 0)")]
    InvalidQuantity {
        product_id: ProductId,
        quantity: i32,
    },

    /// Repeated lines for one product add up past the largest quantity.
    #[error("Total quantity for product {0} is too large")]
    QuantityTooLarge(ProductId),

    /// A point spend is negative.
    #[error("Invalid point amount: {0}")]
    InvalidPoints(i64),

    /// A shipping fee is negative.
    #[error("Invalid shipping fee: {0}")]
    InvalidFee(i64),
}

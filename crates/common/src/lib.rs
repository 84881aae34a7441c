//! Shared identifier types for the commerce workspace.

mod types;

pub use types::{CartId, OrderId, OrderLineId, ProductId, PromotionId, UserId};

//! Commerce domain model.
//!
//! This crate holds the pure parts of ordering:
//! - Catalog products and their effective prices
//! - Loyalty point earning and redemption arithmetic
//! - Promotion eligibility and discount rules
//! - Order commands, records and shipment drafts
//!
//! Nothing here performs I/O. Transactions, locking and side effects live in
//! the `store` and `checkout` crates.

pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod loyalty;
pub mod money;
pub mod order;
pub mod pricing;
pub mod promotion;

pub use cart::{Cart, CartItem};
pub use catalog::Product;
pub use config::PricingConfig;
pub use error::DomainError;
pub use lifecycle::Lifecycle;
pub use loyalty::{User, points_earned, redemption_value};
pub use money::Money;
pub use order::{
    DeliveryOption, Destination, DraftItem, INITIAL_STATUS_ID, Order, OrderDetails, OrderLine,
    PickupAddress, PlaceOrder, Recipient, RequestedLine, ShipmentDraft, UpdateShipmentStatus,
};
pub use pricing::{PricedLine, effective_unit_price, price_lines};
pub use promotion::{
    Promotion, PromotionDiscount, PromotionKind, PromotionRejection, PromotionTarget,
};

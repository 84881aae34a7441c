//! Order placement orchestration.
//!
//! [`OrderOrchestrator`] turns a [`domain::PlaceOrder`] into a persisted order
//! inside one store transaction:
//! 1. Lock and check the requested products
//! 2. Price every line at the current instant
//! 3. Redeem and earn loyalty points
//! 4. Redeem the promotion code
//! 5. Resolve the shipping fee
//! 6. Persist the order and its lines, then take stock
//!
//! If any step fails the transaction is rolled back. Confirmation mail, the
//! operations alert, cart clearing and shipment booking are queued on the
//! [`Outbox`] after commit and never fail the order.

pub mod config;
pub mod error;
pub mod inventory;
pub mod loyalty;
pub mod orchestrator;
pub mod outbox;
pub mod promotions;
pub mod services;

pub use config::{CheckoutConfig, RetryPolicy};
pub use error::CheckoutError;
pub use orchestrator::{OrderOrchestrator, PlacedOrder};
pub use outbox::{Outbox, OutboxWorker, PostCommitTask, TaskError};
pub use promotions::Redemption;
pub use services::{
    FlatRateShipping, HttpShippingClient, HttpShippingConfig, InMemoryNotificationService,
    InMemoryShippingService, LogNotificationService, NotificationError, NotificationService,
    OrderSummary, QuoteRequest, SentNotification, ShippingError, ShippingQuote, ShippingService,
    SummaryLine,
};

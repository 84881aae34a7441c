//! External collaborators of checkout: the shipping partner and notifications.

pub mod http;
pub mod notification;
pub mod shipping;

pub use http::{HttpShippingClient, HttpShippingConfig};
pub use notification::{
    InMemoryNotificationService, LogNotificationService, NotificationError, NotificationService,
    OrderSummary, SentNotification, SummaryLine,
};
pub use shipping::{
    FlatRateShipping, InMemoryShippingService, QuoteRequest, ShippingError, ShippingQuote,
    ShippingService,
};

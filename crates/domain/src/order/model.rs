//! Persisted order records.

use chrono::{DateTime, Utc};
use common::{OrderId, OrderLineId, ProductId, PromotionId, UserId};
use serde::{Deserialize, Serialize};

use super::{Destination, Recipient, UpdateShipmentStatus};
use crate::Money;

/// Shipment status assigned to freshly placed orders.
pub const INITIAL_STATUS_ID: i32 = 1;

/// A placed order.
///
/// Created once at placement; afterwards only shipment-status callbacks
/// touch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub recipient: Recipient,
    pub destination: Destination,
    pub note: Option<String>,
    /// Pre-discount product total.
    pub value: Money,
    /// Product total actually charged after point and promotion discounts.
    pub actual_value: Money,
    pub fee_ship: Money,
    pub point_used: Option<i64>,
    pub point_earned: Option<i64>,
    pub promotion_id: Option<PromotionId>,
    pub status_id: i32,
    pub reason_code: Option<String>,
    pub reason: Option<String>,
    pub user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Cash to collect on delivery.
    pub fn amount_due(&self) -> Money {
        self.actual_value + self.fee_ship
    }

    /// Applies a partner status callback.
    ///
    /// The partner's fee replaces ours and `value` is shifted by the
    /// difference. Applying the same callback twice leaves the order as it
    /// was after the first.
    pub fn apply_shipment_status(&mut self, update: &UpdateShipmentStatus, now: DateTime<Utc>) {
        let fee = update.fee();
        self.value = self.value - self.fee_ship + fee;
        self.fee_ship = fee;
        self.status_id = update.status_id;
        self.reason_code = update.reason_code.clone();
        self.reason = update.reason.clone();
        self.updated_at = Some(now);
    }
}

/// One product line of a placed order. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i32,
    /// Unit price snapshotted at placement time.
    pub price: Money,
}

impl OrderLine {
    pub fn new(order_id: OrderId, product_id: ProductId, quantity: i32, price: Money) -> Self {
        Self {
            id: OrderLineId::new(),
            order_id,
            product_id,
            quantity,
            price,
        }
    }

    pub fn line_total(&self) -> Money {
        self.price.times(i64::from(self.quantity))
    }
}

/// An order together with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

//! Notification sender trait and implementations.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::OrderId;
use domain::{Money, Order};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by notification senders.
#[derive(Debug, Clone, Error)]
pub enum NotificationError {
    /// The message could not be delivered.
    #[error("Notification delivery failed: {0}")]
    DeliveryFailed(String),
}

/// One line of an order as shown in notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryLine {
    pub name: String,
    pub quantity: i32,
    pub unit_price: Money,
    pub line_total: Money,
}

/// What buyers and operations are told about a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_id: OrderId,
    pub buyer_name: String,
    pub buyer_email: String,
    pub buyer_phone: String,
    pub address: String,
    pub lines: Vec<SummaryLine>,
    pub value: Money,
    pub actual_value: Money,
    pub fee_ship: Money,
    pub point_used: Option<i64>,
    pub point_earned: Option<i64>,
}

impl OrderSummary {
    /// Builds a summary from a placed order and its named lines.
    pub fn new(order: &Order, lines: Vec<SummaryLine>) -> Self {
        Self {
            order_id: order.id,
            buyer_name: order.recipient.name.clone(),
            buyer_email: order.recipient.email.clone(),
            buyer_phone: order.recipient.phone.clone(),
            address: order.destination.one_line(),
            lines,
            value: order.value,
            actual_value: order.actual_value,
            fee_ship: order.fee_ship,
            point_used: order.point_used,
            point_earned: order.point_earned,
        }
    }

    /// Cash to collect on delivery.
    pub fn amount_due(&self) -> Money {
        self.actual_value + self.fee_ship
    }
}

/// Trait for order notifications.
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Sends the buyer their order confirmation.
    async fn send_order_confirmation(&self, summary: &OrderSummary)
    -> Result<(), NotificationError>;

    /// Alerts operations staff at `recipient` about a new order.
    async fn send_operations_alert(
        &self,
        recipient: &str,
        summary: &OrderSummary,
    ) -> Result<(), NotificationError>;
}

#[async_trait]
impl<T: NotificationService + ?Sized> NotificationService for Arc<T> {
    async fn send_order_confirmation(
        &self,
        summary: &OrderSummary,
    ) -> Result<(), NotificationError> {
        (**self).send_order_confirmation(summary).await
    }

    async fn send_operations_alert(
        &self,
        recipient: &str,
        summary: &OrderSummary,
    ) -> Result<(), NotificationError> {
        (**self).send_operations_alert(recipient, summary).await
    }
}

/// Writes notifications to the log instead of sending mail.
#[derive(Debug, Clone, Default)]
pub struct LogNotificationService;

#[async_trait]
impl NotificationService for LogNotificationService {
    async fn send_order_confirmation(
        &self,
        summary: &OrderSummary,
    ) -> Result<(), NotificationError> {
        tracing::info!(
            order_id = %summary.order_id,
            to = %summary.buyer_email,
            lines = summary.lines.len(),
            amount_due = summary.amount_due().amount(),
            "order confirmation"
        );
        Ok(())
    }

    async fn send_operations_alert(
        &self,
        recipient: &str,
        summary: &OrderSummary,
    ) -> Result<(), NotificationError> {
        tracing::info!(
            order_id = %summary.order_id,
            to = %recipient,
            buyer = %summary.buyer_name,
            address = %summary.address,
            amount_due = summary.amount_due().amount(),
            "new order alert"
        );
        Ok(())
    }
}

/// A notification recorded by [`InMemoryNotificationService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentNotification {
    Confirmation { to: String, order_id: OrderId },
    OperationsAlert { to: String, order_id: OrderId },
}

#[derive(Debug, Default)]
struct InMemoryNotificationState {
    sent: Vec<SentNotification>,
    attempts: u32,
    failures_remaining: u32,
}

/// In-memory notification service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationService {
    state: Arc<RwLock<InMemoryNotificationState>>,
}

impl InMemoryNotificationService {
    /// Creates a new in-memory notification service.
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, InMemoryNotificationState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, InMemoryNotificationState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Configures every send to fail until switched back.
    pub fn set_fail(&self, fail: bool) {
        self.write().failures_remaining = if fail { u32::MAX } else { 0 };
    }

    /// Configures the next `count` sends to fail.
    pub fn fail_next(&self, count: u32) {
        self.write().failures_remaining = count;
    }

    /// Returns the notifications delivered so far.
    pub fn sent(&self) -> Vec<SentNotification> {
        self.read().sent.clone()
    }

    /// Returns the number of send attempts, failed ones included.
    pub fn attempts(&self) -> u32 {
        self.read().attempts
    }

    fn record(&self, notification: SentNotification) -> Result<(), NotificationError> {
        let mut state = self.write();
        state.attempts += 1;

        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(NotificationError::DeliveryFailed(
                "mail server unavailable".to_string(),
            ));
        }

        state.sent.push(notification);
        Ok(())
    }
}

#[async_trait]
impl NotificationService for InMemoryNotificationService {
    async fn send_order_confirmation(
        &self,
        summary: &OrderSummary,
    ) -> Result<(), NotificationError> {
        self.record(SentNotification::Confirmation {
            to: summary.buyer_email.clone(),
            order_id: summary.order_id,
        })
    }

    async fn send_operations_alert(
        &self,
        recipient: &str,
        summary: &OrderSummary,
    ) -> Result<(), NotificationError> {
        self.record(SentNotification::OperationsAlert {
            to: recipient.to_string(),
            order_id: summary.order_id,
        })
    }
}

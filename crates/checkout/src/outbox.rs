//! Post-commit task queue.
//!
//! Side effects of a placed order are queued only after its transaction has
//! committed, then executed by an [`OutboxWorker`] with retries. A failing
//! task is logged and counted; it never affects the order.

use common::CartId;
use domain::ShipmentDraft;
use serde::{Deserialize, Serialize};
use store::{CartStore, StoreError};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::RetryPolicy;
use crate::services::{
    NotificationError, NotificationService, OrderSummary, ShippingError, ShippingService,
};

/// A side effect to run after an order commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum PostCommitTask {
    /// Confirmation mail to the buyer.
    OrderConfirmation { summary: OrderSummary },
    /// New-order alert to operations staff.
    OperationsAlert {
        recipient: String,
        summary: OrderSummary,
    },
    /// Empty the buyer's cart.
    ClearCart { cart_id: CartId },
    /// Book the shipment with the partner.
    BookShipment { draft: ShipmentDraft },
}

impl PostCommitTask {
    /// Task name used in logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            PostCommitTask::OrderConfirmation { .. } => "order_confirmation",
            PostCommitTask::OperationsAlert { .. } => "operations_alert",
            PostCommitTask::ClearCart { .. } => "clear_cart",
            PostCommitTask::BookShipment { .. } => "book_shipment",
        }
    }
}

/// Why a single task attempt failed.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Notification(#[from] NotificationError),

    #[error(transparent)]
    Shipping(#[from] ShippingError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Sending half of the queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Outbox {
    sender: mpsc::UnboundedSender<PostCommitTask>,
}

impl Outbox {
    /// Creates a queue and returns its receiving half for a worker.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PostCommitTask>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Queues a task. Tasks queued after the worker has stopped are dropped.
    pub fn enqueue(&self, task: PostCommitTask) {
        let name = task.name();
        if self.sender.send(task).is_err() {
            tracing::warn!(task = name, "outbox closed, dropping post-commit task");
            metrics::counter!("post_commit_tasks_total", "task" => name, "outcome" => "dropped")
                .increment(1);
        }
    }
}

/// Executes queued post-commit tasks.
pub struct OutboxWorker<C, Sh, N>
where
    C: CartStore,
    Sh: ShippingService,
    N: NotificationService,
{
    receiver: mpsc::UnboundedReceiver<PostCommitTask>,
    carts: C,
    shipping: Sh,
    notifications: N,
    retry: RetryPolicy,
}

impl<C, Sh, N> OutboxWorker<C, Sh, N>
where
    C: CartStore,
    Sh: ShippingService,
    N: NotificationService,
{
    /// Creates a worker for the queue behind `receiver`.
    pub fn new(
        receiver: mpsc::UnboundedReceiver<PostCommitTask>,
        carts: C,
        shipping: Sh,
        notifications: N,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            receiver,
            carts,
            shipping,
            notifications,
            retry,
        }
    }

    /// Processes tasks until every [`Outbox`] has been dropped.
    pub async fn run(mut self) {
        tracing::info!("outbox worker started");
        while let Some(task) = self.receiver.recv().await {
            self.process(&task).await;
        }
        tracing::info!("outbox worker stopped");
    }

    /// Processes whatever is queued right now and returns how many tasks
    /// succeeded.
    pub async fn drain(&mut self) -> usize {
        let mut succeeded = 0;
        while let Ok(task) = self.receiver.try_recv() {
            if self.process(&task).await {
                succeeded += 1;
            }
        }
        succeeded
    }

    /// Runs one task with retries. Returns true if it eventually succeeded.
    #[tracing::instrument(skip(self, task), fields(task = task.name()))]
    async fn process(&self, task: &PostCommitTask) -> bool {
        let name = task.name();
        let max_attempts = self.retry.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match self.execute(task).await {
                Ok(()) => {
                    metrics::counter!("post_commit_tasks_total", "task" => name, "outcome" => "ok")
                        .increment(1);
                    return true;
                }
                Err(e) if attempt < max_attempts => {
                    tracing::warn!(attempt, error = %e, "post-commit task failed, retrying");
                    tokio::time::sleep(self.retry.delay_after(attempt)).await;
                }
                Err(e) => {
                    tracing::error!(attempt, error = %e, "post-commit task failed, giving up");
                }
            }
        }

        metrics::counter!("post_commit_tasks_total", "task" => name, "outcome" => "failed")
            .increment(1);
        false
    }

    async fn execute(&self, task: &PostCommitTask) -> Result<(), TaskError> {
        match task {
            PostCommitTask::OrderConfirmation { summary } => {
                self.notifications.send_order_confirmation(summary).await?;
            }
            PostCommitTask::OperationsAlert { recipient, summary } => {
                self.notifications
                    .send_operations_alert(recipient, summary)
                    .await?;
            }
            PostCommitTask::ClearCart { cart_id } => {
                let removed = self.carts.clear_cart(*cart_id).await?;
                tracing::debug!(%cart_id, removed, "cart cleared");
            }
            PostCommitTask::BookShipment { draft } => {
                let partner_id = self.shipping.create_shipment(draft).await?;
                tracing::info!(order_id = %draft.order.id, %partner_id, "shipment booked");
            }
        }
        Ok(())
    }
}

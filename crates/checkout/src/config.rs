//! Checkout configuration.

use std::time::Duration;

use domain::{PickupAddress, PricingConfig};

/// Retry schedule for post-commit tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per task, including the first.
    pub max_attempts: u32,
    /// Delay after the first failure; grows linearly with each attempt.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Runs each task once.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    /// Delay before retrying after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(200),
        }
    }
}

/// Everything the orchestrator and outbox need besides their collaborators.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    pub pricing: PricingConfig,
    /// Copied into every shipment draft.
    pub pickup: PickupAddress,
    /// Recipient of new-order alerts.
    pub operations_email: String,
    /// When false, shipment drafts are returned but never booked.
    pub book_shipments: bool,
    pub notification_retry: RetryPolicy,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            pricing: PricingConfig::default(),
            pickup: PickupAddress::default(),
            operations_email: "operations@example.com".to_string(),
            book_shipments: false,
            notification_retry: RetryPolicy::default(),
        }
    }
}

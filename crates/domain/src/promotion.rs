//! Promotion codes and the rules for applying them.

use chrono::{DateTime, Utc};
use common::PromotionId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Lifecycle, Money};

/// How a promotion's `value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromotionKind {
    /// `value` is a percentage of the order total.
    Percent,
    /// `value` is a fixed amount.
    Money,
}

impl PromotionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromotionKind::Percent => "percent",
            PromotionKind::Money => "money",
        }
    }
}

impl std::str::FromStr for PromotionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percent" => Ok(PromotionKind::Percent),
            "money" => Ok(PromotionKind::Money),
            other => Err(format!("unknown promotion kind: {other}")),
        }
    }
}

/// What a promotion discounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromotionTarget {
    /// Reduces the product value of the order.
    Product,
    /// Waives the shipping fee.
    Shipping,
}

impl PromotionTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromotionTarget::Product => "product",
            PromotionTarget::Shipping => "shipping",
        }
    }
}

impl std::str::FromStr for PromotionTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "product" => Ok(PromotionTarget::Product),
            "shipping" => Ok(PromotionTarget::Shipping),
            other => Err(format!("unknown promotion target: {other}")),
        }
    }
}

/// Why a promotion code cannot be redeemed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PromotionRejection {
    /// No such code, or the promotion is inactive or soft-deleted.
    #[error("promotion not found")]
    NotFound,

    /// `expired_at` has passed.
    #[error("promotion expired")]
    Expired,

    /// `used_times` has reached `max_used_times`.
    #[error("promotion has reached its maximum number of uses")]
    Exhausted,
}

/// A promotion record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promotion {
    pub id: PromotionId,
    pub is_active: bool,
    pub name: String,
    pub description: String,
    pub code: String,
    pub kind: PromotionKind,
    pub target: PromotionTarget,
    /// Percentage for `Percent`, currency amount for `Money`.
    pub value: i64,
    /// Cap for percentage discounts.
    pub max_value: Option<Money>,
    pub used_times: i32,
    pub max_used_times: Option<i32>,
    pub expired_at: Option<DateTime<Utc>>,
    pub lifecycle: Lifecycle,
}

/// The effect of applying a usable promotion to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionDiscount {
    /// Reduction of the product value. Zero for shipping promotions.
    pub amount: Money,
    /// True when the promotion waives shipping.
    pub free_shipping: bool,
}

impl Promotion {
    /// Creates an active, unlimited, non-expiring promotion.
    pub fn new(
        code: impl Into<String>,
        kind: PromotionKind,
        target: PromotionTarget,
        value: i64,
    ) -> Self {
        let code = code.into();
        Self {
            id: PromotionId::new(),
            is_active: true,
            name: code.clone(),
            description: String::new(),
            code,
            kind,
            target,
            value,
            max_value: None,
            used_times: 0,
            max_used_times: None,
            expired_at: None,
            lifecycle: Lifecycle::default(),
        }
    }

    /// Returns true if `expired_at` is set and already passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expired_at.is_some_and(|at| at < now)
    }

    /// Returns true if a usage limit is set and reached.
    pub fn is_exhausted(&self) -> bool {
        self.max_used_times.is_some_and(|max| self.used_times >= max)
    }

    /// Checks whether the promotion can be redeemed at `now`.
    ///
    /// Checks run in a fixed order: visibility, expiry, usage limit.
    pub fn check_usable(&self, now: DateTime<Utc>) -> Result<(), PromotionRejection> {
        if !self.is_active || !self.lifecycle.is_live() {
            return Err(PromotionRejection::NotFound);
        }
        if self.is_expired(now) {
            return Err(PromotionRejection::Expired);
        }
        if self.is_exhausted() {
            return Err(PromotionRejection::Exhausted);
        }
        Ok(())
    }

    /// Computes the discount this promotion grants on an order of `total`.
    ///
    /// Percentage discounts are capped by `max_value`; fixed discounts never
    /// exceed the total. Shipping promotions reduce nothing and flag free
    /// shipping instead.
    pub fn discount_for(&self, total: Money) -> PromotionDiscount {
        if self.target == PromotionTarget::Shipping {
            return PromotionDiscount {
                amount: Money::zero(),
                free_shipping: true,
            };
        }

        let amount = match self.kind {
            PromotionKind::Percent => {
                let raw = total.percent(self.value);
                match self.max_value {
                    Some(cap) => raw.min(cap),
                    None => raw,
                }
            }
            PromotionKind::Money => Money::new(self.value).min(total),
        };

        PromotionDiscount {
            amount: amount.non_negative(),
            free_shipping: false,
        }
    }
}

/// Resolves a looked-up promotion to a usable one.
///
/// A missing record is `NotFound`, same as an inactive or deleted one.
pub fn resolve(
    promotion: Option<&Promotion>,
    now: DateTime<Utc>,
) -> Result<&Promotion, PromotionRejection> {
    let promotion = promotion.ok_or(PromotionRejection::NotFound)?;
    promotion.check_usable(now)?;
    Ok(promotion)
}

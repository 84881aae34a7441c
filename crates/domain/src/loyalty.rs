//! Loyalty point rules.
//!
//! The arithmetic lives here; balance mutation happens inside the checkout
//! transaction.

use common::UserId;
use serde::{Deserialize, Serialize};

use crate::{Lifecycle, Money, PricingConfig};

/// A registered buyer and their point balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    /// Point balance. Never negative.
    pub points: i64,
    pub lifecycle: Lifecycle,
}

impl User {
    /// Creates a live user with the given balance.
    pub fn new(email: impl Into<String>, name: impl Into<String>, points: i64) -> Self {
        Self {
            id: UserId::new(),
            email: email.into(),
            name: name.into(),
            points,
            lifecycle: Lifecycle::default(),
        }
    }
}

/// Points earned by a purchase totalling `total`.
///
/// Below `earn_threshold` nothing is earned. Above it the total is expressed
/// in `earn_unit`s, rounded half-up to one decimal place, then scaled by
/// `points_per_earn_unit` (any fractional point left over is dropped).
/// With the defaults this is `round_half_up(total / 100_000)`.
pub fn points_earned(total: Money, config: &PricingConfig) -> i64 {
    if total < config.earn_threshold || config.earn_unit.amount() <= 0 {
        return 0;
    }

    let numerator = i128::from(total.amount()) * 10;
    let unit = i128::from(config.earn_unit.amount());
    let tenths = (2 * numerator + unit) / (2 * unit);
    let points = tenths * i128::from(config.points_per_earn_unit) / 10;

    i64::try_from(points).unwrap_or(i64::MAX)
}

/// Currency discount granted for spending `points`.
pub fn redemption_value(points: i64, config: &PricingConfig) -> Money {
    config.point_value.times(points)
}

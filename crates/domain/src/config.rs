//! Pricing constants, built once at start-up and passed to whatever needs them.

use crate::Money;

/// Monetary rules that drive order pricing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingConfig {
    /// Orders whose pre-discount total is strictly above this ship for free.
    pub free_shipping_threshold: Money,

    /// Fee charged when no free-shipping trigger applies and no quote is available.
    pub flat_shipping_fee: Money,

    /// Currency value of one loyalty point.
    pub point_value: Money,

    /// Smallest purchase total that earns any points.
    pub earn_threshold: Money,

    /// Purchase amount that earns `points_per_earn_unit` points.
    pub earn_unit: Money,

    /// Points awarded per full `earn_unit`.
    pub points_per_earn_unit: i64,

    /// Smallest point spend accepted at checkout.
    pub min_point_redemption: i64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            free_shipping_threshold: Money::millions(2),
            flat_shipping_fee: Money::thousands(30),
            point_value: Money::thousands(1),
            earn_threshold: Money::millions(1),
            earn_unit: Money::millions(1),
            points_per_earn_unit: 10,
            min_point_redemption: 20,
        }
    }
}

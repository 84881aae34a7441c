//! Pricing calculator.
//!
//! Pure functions over product snapshots. Prices are evaluated against the
//! instant the order is placed, never cached, because sale windows expire.

use chrono::{DateTime, Utc};
use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::{Money, Product};

/// Returns the price actually charged for one unit of `product` at `now`.
///
/// The sale price wins only while its window is open. A zero sale price is
/// treated as "no sale".
pub fn effective_unit_price(product: &Product, now: DateTime<Utc>) -> Money {
    match (product.sale_price, product.sale_end_at) {
        (Some(sale), Some(ends_at)) if !sale.is_zero() && ends_at > now => sale,
        _ => product.price,
    }
}

/// One priced line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub product_id: ProductId,
    pub quantity: i32,
    pub unit_price: Money,
}

impl PricedLine {
    /// Returns `unit_price * quantity`.
    pub fn line_total(&self) -> Money {
        self.unit_price.times(i64::from(self.quantity))
    }
}

/// Prices every `(product, quantity)` pair at `now`.
///
/// Returns the priced lines in input order and their sum.
pub fn price_lines<'a, I>(lines: I, now: DateTime<Utc>) -> (Vec<PricedLine>, Money)
where
    I: IntoIterator<Item = (&'a Product, i32)>,
{
    let priced: Vec<PricedLine> = lines
        .into_iter()
        .map(|(product, quantity)| PricedLine {
            product_id: product.id,
            quantity,
            unit_price: effective_unit_price(product, now),
        })
        .collect();
    let total = priced.iter().map(PricedLine::line_total).sum();
    (priced, total)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn product(price: i64) -> Product {
        Product::new("Bird nest", "bird-nest", Money::new(price), 10, 100)
    }

    #[test]
    fn test_regular_price_without_sale() {
        let now = Utc::now();
        assert_eq!(effective_unit_price(&product(500_000), now), Money::new(500_000));
    }

    #[test]
    fn test_active_sale_wins() {
        let now = Utc::now();
        let p = product(500_000).with_sale(Money::new(400_000), now + Duration::days(1));
        assert_eq!(effective_unit_price(&p, now), Money::new(400_000));
    }

    #[test]
    fn test_expired_sale_ignored() {
        let now = Utc::now();
        let p = product(500_000).with_sale(Money::new(400_000), now - Duration::seconds(1));
        assert_eq!(effective_unit_price(&p, now), Money::new(500_000));
    }

    #[test]
    fn test_sale_ending_exactly_now_is_over() {
        let now = Utc::now();
        let p = product(500_000).with_sale(Money::new(400_000), now);
        assert_eq!(effective_unit_price(&p, now), Money::new(500_000));
    }

    #[test]
    fn test_sale_price_without_end_ignored() {
        let mut p = product(500_000);
        p.sale_price = Some(Money::new(1));
        assert_eq!(effective_unit_price(&p, Utc::now()), Money::new(500_000));
    }

    #[test]
    fn test_price_lines_totals() {
        let now = Utc::now();
        let a = product(500_000);
        let b = product(120_000).with_sale(Money::new(100_000), now + Duration::hours(2));

        let (lines, total) = price_lines([(&a, 2), (&b, 3)], now);

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].unit_price, Money::new(100_000));
        assert_eq!(total, Money::new(1_300_000));
    }

    #[test]
    fn test_price_lines_saturates_huge_totals() {
        let now = Utc::now();
        let a = product(5_000_000_000);
        let b = product(1);

        let (lines, total) = price_lines([(&a, i32::MAX), (&b, 1)], now);

        assert_eq!(lines[0].line_total(), Money::new(i64::MAX));
        assert_eq!(total, Money::new(i64::MAX));
    }
}

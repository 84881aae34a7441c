//! Integration tests for the pricing rules as a whole.
//!
//! These walk through complete orders the way checkout computes them, using
//! only the public domain API.

use chrono::{Duration, Utc};
use domain::promotion::resolve;
use domain::{
    Money, PricingConfig, Product, Promotion, PromotionKind, PromotionRejection, PromotionTarget,
    points_earned, price_lines, redemption_value,
};

mod full_orders {
    use super::*;

    #[test]
    fn sale_price_points_and_threshold() {
        let config = PricingConfig::default();
        let now = Utc::now();
        let a = Product::new("A", "a", Money::new(500_000), 10, 200)
            .with_sale(Money::new(400_000), now + Duration::days(1));
        let b = Product::new("B", "b", Money::new(600_000), 10, 300);

        let (lines, total) = price_lines([(&a, 2), (&b, 1)], now);

        assert_eq!(lines[0].unit_price, Money::new(400_000));
        assert_eq!(total, Money::new(1_400_000));
        assert_eq!(points_earned(total, &config), 14);
        assert!(total <= config.free_shipping_threshold);
    }

    #[test]
    fn points_and_promotion_stack() {
        let config = PricingConfig::default();
        let now = Utc::now();
        let product = Product::new("A", "a", Money::new(1_000_000), 5, 500);
        let mut promotion =
            Promotion::new("TEN", PromotionKind::Percent, PromotionTarget::Product, 10);
        promotion.max_value = Some(Money::new(50_000));

        let (_, total) = price_lines([(&product, 1)], now);
        let point_discount = redemption_value(30, &config);
        let promotion_discount = resolve(Some(&promotion), now)
            .unwrap()
            .discount_for(total);

        let actual = (total - point_discount - promotion_discount.amount).non_negative();

        assert_eq!(promotion_discount.amount, Money::new(50_000));
        assert_eq!(actual, Money::new(920_000));
        assert_eq!(points_earned(total, &config), 10);
    }

    #[test]
    fn discounts_never_push_value_below_zero() {
        let config = PricingConfig::default();
        let now = Utc::now();
        let product = Product::new("A", "a", Money::new(20_000), 5, 100);
        let promotion = Promotion::new("BIG", PromotionKind::Money, PromotionTarget::Product, 1_000_000);

        let (_, total) = price_lines([(&product, 1)], now);
        let discount = promotion.discount_for(total).amount;
        let actual = (total - redemption_value(25, &config) - discount).non_negative();

        assert_eq!(discount, Money::new(20_000));
        assert_eq!(actual, Money::zero());
    }

    #[test]
    fn expired_sale_falls_back_to_list_price() {
        let now = Utc::now();
        let product = Product::new("A", "a", Money::new(300_000), 5, 100)
            .with_sale(Money::new(100_000), now - Duration::seconds(1));

        let (_, total) = price_lines([(&product, 3)], now);

        assert_eq!(total, Money::new(900_000));
    }
}

mod promotion_eligibility {
    use super::*;

    #[test]
    fn missing_code_is_not_found() {
        assert_eq!(resolve(None, Utc::now()), Err(PromotionRejection::NotFound));
    }

    #[test]
    fn expiry_is_checked_before_usage() {
        let now = Utc::now();
        let mut promotion =
            Promotion::new("OLD", PromotionKind::Money, PromotionTarget::Product, 10_000);
        promotion.expired_at = Some(now - Duration::days(1));
        promotion.max_used_times = Some(1);
        promotion.used_times = 1;

        assert_eq!(
            resolve(Some(&promotion), now),
            Err(PromotionRejection::Expired)
        );
    }

    #[test]
    fn shipping_promotion_only_waives_shipping() {
        let promotion =
            Promotion::new("SHIP", PromotionKind::Money, PromotionTarget::Shipping, 30_000);
        let discount = promotion.discount_for(Money::new(500_000));

        assert!(discount.free_shipping);
        assert_eq!(discount.amount, Money::zero());
    }
}

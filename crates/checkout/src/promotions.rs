//! Promotion redemption inside the placement transaction.

use chrono::{DateTime, Utc};
use domain::{Money, Promotion, PromotionDiscount, promotion};
use store::{CommerceStore, UnitOfWork};

use crate::error::{CheckoutError, Result};

/// A promotion applied to an order.
#[derive(Debug, Clone)]
pub struct Redemption {
    pub promotion: Promotion,
    pub discount: PromotionDiscount,
}

/// Validates `code`, computes its discount on `total` and records one use.
///
/// The promotion row stays locked until the transaction ends, so two orders
/// cannot both take the last use.
pub async fn redeem(
    uow: &mut dyn UnitOfWork,
    code: &str,
    total: Money,
    now: DateTime<Utc>,
) -> Result<Redemption> {
    let locked = uow.lock_promotion_by_code(code).await?;
    let usable = promotion::resolve(locked.as_ref(), now)
        .map_err(|rejection| CheckoutError::from_rejection(rejection, code))?;
    let discount = usable.discount_for(total);

    if !uow.increment_promotion_usage(usable.id).await? {
        return Err(CheckoutError::PromotionExhausted(code.to_string()));
    }

    Ok(Redemption {
        promotion: usable.clone(),
        discount,
    })
}

/// Validates `code` without redeeming it.
pub async fn preview<S: CommerceStore + ?Sized>(
    store: &S,
    code: &str,
    now: DateTime<Utc>,
) -> Result<Promotion> {
    let found = store.find_promotion_by_code(code).await?;
    promotion::resolve(found.as_ref(), now)
        .map(Promotion::clone)
        .map_err(|rejection| CheckoutError::from_rejection(rejection, code))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use domain::{PromotionKind, PromotionTarget};
    use store::InMemoryStore;

    use super::*;

    async fn store_with(promotion: &Promotion) -> InMemoryStore {
        let store = InMemoryStore::new();
        store.save_promotion(promotion).await;
        store
    }

    fn percent() -> Promotion {
        let mut promotion =
            Promotion::new("TEN", PromotionKind::Percent, PromotionTarget::Product, 10);
        promotion.max_value = Some(Money::new(50_000));
        promotion
    }

    #[tokio::test]
    async fn test_redeem_increments_once() {
        let promotion = percent();
        let store = store_with(&promotion).await;

        let mut uow = store.begin().await.unwrap();
        let redemption = redeem(uow.as_mut(), "TEN", Money::new(1_000_000), Utc::now())
            .await
            .unwrap();
        uow.commit().await.unwrap();

        assert_eq!(redemption.discount.amount, Money::new(50_000));
        let stored = store.find_promotion_by_code("TEN").await.unwrap().unwrap();
        assert_eq!(stored.used_times, 1);
    }

    #[tokio::test]
    async fn test_exhausted() {
        let mut promotion = percent();
        promotion.max_used_times = Some(2);
        promotion.used_times = 2;
        let store = store_with(&promotion).await;

        let mut uow = store.begin().await.unwrap();
        let err = redeem(uow.as_mut(), "TEN", Money::new(1_000_000), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "promotion-003");
    }

    #[tokio::test]
    async fn test_expired_wins_over_remaining_uses() {
        let mut promotion = percent();
        promotion.expired_at = Some(Utc::now() - Duration::hours(1));
        promotion.max_used_times = Some(5);
        let store = store_with(&promotion).await;

        let mut uow = store.begin().await.unwrap();
        let err = redeem(uow.as_mut(), "TEN", Money::new(1_000_000), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::PromotionExpired(code) if code == "TEN"));
    }

    #[tokio::test]
    async fn test_deleted_is_not_found() {
        let mut promotion = percent();
        promotion.lifecycle.mark_deleted(Utc::now());
        let store = store_with(&promotion).await;

        let err = preview(&store, "TEN", Utc::now()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::PromotionNotFound(_)));
    }

    #[tokio::test]
    async fn test_preview_does_not_redeem() {
        let promotion = percent();
        let store = store_with(&promotion).await;

        let previewed = preview(&store, "TEN", Utc::now()).await.unwrap();
        assert_eq!(previewed.id, promotion.id);

        let stored = store.find_promotion_by_code("TEN").await.unwrap().unwrap();
        assert_eq!(stored.used_times, 0);
    }
}

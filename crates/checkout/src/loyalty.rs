//! Point redemption and earning inside the placement transaction.

use common::UserId;
use domain::{Money, PricingConfig, redemption_value};
use store::UnitOfWork;

use crate::error::{CheckoutError, Result};

/// Debits `points` from the buyer and returns the equivalent discount.
///
/// The balance row is locked before it is compared, so concurrent spends on
/// the same buyer serialize. A spend above the balance fails without
/// touching it.
pub async fn redeem(
    uow: &mut dyn UnitOfWork,
    user_id: UserId,
    points: i64,
    config: &PricingConfig,
) -> Result<Money> {
    let available = uow
        .lock_user_points(user_id)
        .await?
        .ok_or(CheckoutError::BuyerNotFound(user_id))?;

    if points > available {
        return Err(CheckoutError::InsufficientPoints {
            requested: points,
            available,
        });
    }

    if !uow.adjust_points(user_id, -points).await? {
        return Err(CheckoutError::InsufficientPoints {
            requested: points,
            available,
        });
    }

    Ok(redemption_value(points, config))
}

/// Credits earned points to the buyer.
pub async fn credit(uow: &mut dyn UnitOfWork, user_id: UserId, points: i64) -> Result<()> {
    if points <= 0 {
        return Ok(());
    }
    if !uow.adjust_points(user_id, points).await? {
        return Err(CheckoutError::BuyerNotFound(user_id));
    }
    Ok(())
}

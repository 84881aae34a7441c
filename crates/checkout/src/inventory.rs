//! Inventory reservation inside the placement transaction.

use std::collections::BTreeMap;

use common::ProductId;
use domain::Product;
use store::UnitOfWork;

use crate::error::{CheckoutError, Result};

/// Locks every requested product and checks it can be supplied.
///
/// Fails with `ProductUnavailable` for the first product (in id order) that
/// is missing, inactive, deleted or short on stock. Nothing is written.
pub async fn check_availability(
    uow: &mut dyn UnitOfWork,
    requested: &BTreeMap<ProductId, i32>,
) -> Result<BTreeMap<ProductId, Product>> {
    let ids: Vec<ProductId> = requested.keys().copied().collect();
    let mut products: BTreeMap<ProductId, Product> = uow
        .lock_products(&ids)
        .await?
        .into_iter()
        .map(|product| (product.id, product))
        .collect();

    for (&product_id, &quantity) in requested {
        match products.get(&product_id) {
            Some(product) if product.can_supply(quantity) => {}
            _ => {
                tracing::info!(%product_id, quantity, "product unavailable");
                return Err(CheckoutError::ProductUnavailable(product_id));
            }
        }
    }

    products.retain(|id, _| requested.contains_key(id));
    Ok(products)
}

/// Takes the requested quantities from stock.
///
/// A guard failure here means stock moved under the lock, which is reported
/// the same way as a failed availability check.
pub async fn decrement(
    uow: &mut dyn UnitOfWork,
    requested: &BTreeMap<ProductId, i32>,
) -> Result<()> {
    for (&product_id, &quantity) in requested {
        if !uow.decrement_inventory(product_id, quantity).await? {
            return Err(CheckoutError::ProductUnavailable(product_id));
        }
    }
    Ok(())
}

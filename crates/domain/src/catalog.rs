//! Catalog products as seen by the ordering flow.

use chrono::{DateTime, Utc};
use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::{Lifecycle, Money};

/// A purchasable product snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub is_active: bool,
    pub name: String,
    pub slug: String,
    pub price: Money,
    pub sale_price: Option<Money>,
    pub sale_end_at: Option<DateTime<Utc>>,
    /// Units in stock. Never negative.
    pub inventory: i32,
    pub weight_grams: i32,
    pub lifecycle: Lifecycle,
}

impl Product {
    /// Creates an active, non-deleted product with no sale.
    pub fn new(
        name: impl Into<String>,
        slug: impl Into<String>,
        price: Money,
        inventory: i32,
        weight_grams: i32,
    ) -> Self {
        Self {
            id: ProductId::new(),
            is_active: true,
            name: name.into(),
            slug: slug.into(),
            price,
            sale_price: None,
            sale_end_at: None,
            inventory,
            weight_grams,
            lifecycle: Lifecycle::default(),
        }
    }

    /// Puts the product on sale until `ends_at`.
    pub fn with_sale(mut self, sale_price: Money, ends_at: DateTime<Utc>) -> Self {
        self.sale_price = Some(sale_price);
        self.sale_end_at = Some(ends_at);
        self
    }

    /// Returns true if the product can be ordered at all.
    pub fn is_orderable(&self) -> bool {
        self.is_active && self.lifecycle.is_live()
    }

    /// Returns true if `quantity` units can be taken from stock.
    pub fn can_supply(&self, quantity: i32) -> bool {
        self.is_orderable() && quantity <= self.inventory
    }

    /// Weight in kilograms, as shipping partners expect it.
    pub fn weight_kg(&self) -> f64 {
        f64::from(self.weight_grams) / 1000.0
    }
}

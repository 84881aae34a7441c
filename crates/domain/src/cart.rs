//! Per-user cart staging area.

use common::{CartId, ProductId, UserId};
use serde::{Deserialize, Serialize};

/// A cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// A user's cart. Emptied after that user places an order, never otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub items: Vec<CartItem>,
}

impl Cart {
    /// Creates an empty cart for `user_id`.
    pub fn new(user_id: UserId) -> Self {
        Self {
            id: CartId::new(),
            user_id,
            items: Vec::new(),
        }
    }

    /// Adds a line.
    pub fn with_item(mut self, product_id: ProductId, quantity: i32) -> Self {
        self.items.push(CartItem {
            product_id,
            quantity,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

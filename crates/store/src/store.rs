//! Persistence traits implemented by the Postgres and in-memory stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CartId, OrderId, ProductId, PromotionId, UserId};
use domain::{Cart, Order, OrderDetails, OrderLine, Product, Promotion, UpdateShipmentStatus, User};

use crate::Result;

/// Read access and transaction entry point for the commerce store.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait CommerceStore: Send + Sync {
    /// Opens a unit of work.
    ///
    /// Nothing written through it is visible to other callers until
    /// [`UnitOfWork::commit`]. Dropping it without committing discards every
    /// write.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>>;

    /// Retrieves an order and its lines.
    async fn get_order(&self, id: OrderId) -> Result<Option<OrderDetails>>;

    /// Retrieves a product, including inactive or soft-deleted ones.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Retrieves a user, including soft-deleted ones.
    async fn get_user(&self, id: UserId) -> Result<Option<User>>;

    /// Looks up a promotion by code without locking it.
    async fn find_promotion_by_code(&self, code: &str) -> Result<Option<Promotion>>;

    /// Applies a shipment-status callback in one atomic statement.
    ///
    /// Returns the updated order, or None if no live order has that id.
    async fn apply_shipment_status(
        &self,
        update: &UpdateShipmentStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>>;
}

/// One transaction over the commerce store.
///
/// Methods named `lock_*` take row locks that are held until commit or
/// rollback. Conditional writes return false instead of erroring when their
/// guard fails, so the caller can map the outcome to a business error.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Locks the given products in id order and returns those that exist.
    async fn lock_products(&mut self, ids: &[ProductId]) -> Result<Vec<Product>>;

    /// Locks a live user's row and returns their point balance.
    async fn lock_user_points(&mut self, user_id: UserId) -> Result<Option<i64>>;

    /// Adds `delta` to a user's balance unless the result would be negative.
    async fn adjust_points(&mut self, user_id: UserId, delta: i64) -> Result<bool>;

    /// Locks a promotion by code, whatever its state.
    async fn lock_promotion_by_code(&mut self, code: &str) -> Result<Option<Promotion>>;

    /// Increments `used_times` unless the usage limit is already reached.
    async fn increment_promotion_usage(&mut self, id: PromotionId) -> Result<bool>;

    /// Inserts a new order row.
    async fn insert_order(&mut self, order: &Order) -> Result<()>;

    /// Inserts order lines.
    async fn insert_order_lines(&mut self, lines: &[OrderLine]) -> Result<()>;

    /// Takes `quantity` units from stock unless that would go below zero.
    async fn decrement_inventory(&mut self, product_id: ProductId, quantity: i32) -> Result<bool>;

    /// Returns the id of the user's live cart, if any.
    async fn find_cart_id(&mut self, user_id: UserId) -> Result<Option<CartId>>;

    /// Makes every write visible atomically.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discards every write.
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Cart maintenance performed outside the placement transaction.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Retrieves a user's live cart with its items.
    async fn find_cart(&self, user_id: UserId) -> Result<Option<Cart>>;

    /// Removes every item from a cart and returns how many were removed.
    async fn clear_cart(&self, cart_id: CartId) -> Result<u64>;
}

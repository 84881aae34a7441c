use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CartId, OrderId, ProductId, PromotionId, UserId};
use domain::{Cart, Order, OrderDetails, OrderLine, Product, Promotion, UpdateShipmentStatus, User};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    Result, StoreError,
    store::{CartStore, CommerceStore, UnitOfWork},
};

#[derive(Debug, Clone, Default)]
struct StoreState {
    products: BTreeMap<ProductId, Product>,
    users: HashMap<UserId, User>,
    promotions: HashMap<PromotionId, Promotion>,
    carts: HashMap<CartId, Cart>,
    orders: HashMap<OrderId, Order>,
    order_lines: Vec<OrderLine>,
}

impl StoreState {
    fn promotion_by_code(&self, code: &str) -> Option<&Promotion> {
        self.promotions.values().find(|p| p.code == code)
    }

    fn cart_for(&self, user_id: UserId) -> Option<&Cart> {
        self.carts.values().find(|c| c.user_id == user_id)
    }
}

/// In-memory commerce store for testing.
///
/// Provides the same interface as the PostgreSQL implementation. A unit of
/// work holds the whole store exclusively and writes to a staged copy that
/// replaces the live state on commit.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
    fail_on_order_insert: Arc<AtomicBool>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent order insert fail, to exercise rollback.
    pub fn set_fail_on_order_insert(&self, fail: bool) {
        self.fail_on_order_insert.store(fail, Ordering::SeqCst);
    }

    /// Inserts or replaces a product.
    pub async fn save_product(&self, product: &Product) {
        self.state
            .lock()
            .await
            .products
            .insert(product.id, product.clone());
    }

    /// Inserts or replaces a user.
    pub async fn save_user(&self, user: &User) {
        self.state.lock().await.users.insert(user.id, user.clone());
    }

    /// Inserts or replaces a promotion.
    pub async fn save_promotion(&self, promotion: &Promotion) {
        self.state
            .lock()
            .await
            .promotions
            .insert(promotion.id, promotion.clone());
    }

    /// Inserts or replaces a cart.
    pub async fn save_cart(&self, cart: &Cart) {
        self.state.lock().await.carts.insert(cart.id, cart.clone());
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    /// Returns the number of stored order lines.
    pub async fn order_line_count(&self) -> usize {
        self.state.lock().await.order_lines.len()
    }
}

#[async_trait]
impl CommerceStore for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(InMemoryUnitOfWork {
            guard,
            staged,
            fail_on_order_insert: self.fail_on_order_insert.load(Ordering::SeqCst),
        }))
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderDetails>> {
        let state = self.state.lock().await;
        Ok(state.orders.get(&id).map(|order| OrderDetails {
            order: order.clone(),
            lines: state
                .order_lines
                .iter()
                .filter(|line| line.order_id == id)
                .cloned()
                .collect(),
        }))
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.lock().await.products.get(&id).cloned())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn find_promotion_by_code(&self, code: &str) -> Result<Option<Promotion>> {
        Ok(self.state.lock().await.promotion_by_code(code).cloned())
    }

    async fn apply_shipment_status(
        &self,
        update: &UpdateShipmentStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>> {
        let mut state = self.state.lock().await;
        Ok(state.orders.get_mut(&update.partner_id).map(|order| {
            order.apply_shipment_status(update, now);
            order.clone()
        }))
    }
}

#[async_trait]
impl CartStore for InMemoryStore {
    async fn find_cart(&self, user_id: UserId) -> Result<Option<Cart>> {
        Ok(self.state.lock().await.cart_for(user_id).cloned())
    }

    async fn clear_cart(&self, cart_id: CartId) -> Result<u64> {
        let mut state = self.state.lock().await;
        Ok(state.carts.get_mut(&cart_id).map_or(0, |cart| {
            let removed = cart.items.len() as u64;
            cart.items.clear();
            removed
        }))
    }
}

/// A unit of work over an [`InMemoryStore`].
///
/// Dropping it without committing discards the staged copy.
pub struct InMemoryUnitOfWork {
    guard: OwnedMutexGuard<StoreState>,
    staged: StoreState,
    fail_on_order_insert: bool,
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn lock_products(&mut self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        Ok(ids
            .iter()
            .filter_map(|id| self.staged.products.get(id).cloned())
            .collect())
    }

    async fn lock_user_points(&mut self, user_id: UserId) -> Result<Option<i64>> {
        Ok(self
            .staged
            .users
            .get(&user_id)
            .filter(|user| user.lifecycle.is_live())
            .map(|user| user.points))
    }

    async fn adjust_points(&mut self, user_id: UserId, delta: i64) -> Result<bool> {
        match self.staged.users.get_mut(&user_id) {
            Some(user) if user.points + delta >= 0 => {
                user.points += delta;
                user.lifecycle.touch(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn lock_promotion_by_code(&mut self, code: &str) -> Result<Option<Promotion>> {
        Ok(self.staged.promotion_by_code(code).cloned())
    }

    async fn increment_promotion_usage(&mut self, id: PromotionId) -> Result<bool> {
        match self.staged.promotions.get_mut(&id) {
            Some(promotion) if !promotion.is_exhausted() => {
                promotion.used_times += 1;
                promotion.lifecycle.touch(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        if self.fail_on_order_insert {
            return Err(StoreError::WriteRejected(format!(
                "order {} could not be inserted",
                order.id
            )));
        }
        if self.staged.orders.contains_key(&order.id) {
            return Err(StoreError::WriteRejected(format!(
                "order {} already exists",
                order.id
            )));
        }
        self.staged.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn insert_order_lines(&mut self, lines: &[OrderLine]) -> Result<()> {
        for line in lines {
            if !self.staged.orders.contains_key(&line.order_id) {
                return Err(StoreError::WriteRejected(format!(
                    "order line references unknown order {}",
                    line.order_id
                )));
            }
        }
        self.staged.order_lines.extend_from_slice(lines);
        Ok(())
    }

    async fn decrement_inventory(&mut self, product_id: ProductId, quantity: i32) -> Result<bool> {
        match self.staged.products.get_mut(&product_id) {
            Some(product) if product.inventory >= quantity => {
                product.inventory -= quantity;
                product.lifecycle.touch(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_cart_id(&mut self, user_id: UserId) -> Result<Option<CartId>> {
        Ok(self.staged.cart_for(user_id).map(|cart| cart.id))
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let Self {
            mut guard, staged, ..
        } = *self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

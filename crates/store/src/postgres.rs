use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CartId, OrderId, OrderLineId, ProductId, PromotionId, UserId};
use domain::{
    Cart, CartItem, Destination, Lifecycle, Money, Order, OrderDetails, OrderLine, Product,
    Promotion, Recipient, UpdateShipmentStatus, User,
};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Result, StoreError,
    store::{CartStore, CommerceStore, UnitOfWork},
};

const PRODUCT_COLUMNS: &str = "id, is_active, name, slug, price, sale_price, sale_end_at, inventory, weight, is_deleted, deleted_at, created_at, updated_at";

const PROMOTION_COLUMNS: &str = "id, is_active, name, description, code, kind, target, value, max_value, used_times, max_used_times, expired_at, is_deleted, deleted_at, created_at, updated_at";

const ORDER_COLUMNS: &str = "id, name, phone, email, province, district, ward, street, address, note, value, actual_value, fee_ship, point_used, point_earned, promotion_id, status_id, reason_code, reason, user_id, created_at, updated_at";

/// PostgreSQL-backed commerce store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Inserts or replaces a product.
    pub async fn save_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, is_active, name, slug, price, sale_price, sale_end_at, inventory, weight, is_deleted, deleted_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id) DO UPDATE SET
                is_active = EXCLUDED.is_active,
                name = EXCLUDED.name,
                slug = EXCLUDED.slug,
                price = EXCLUDED.price,
                sale_price = EXCLUDED.sale_price,
                sale_end_at = EXCLUDED.sale_end_at,
                inventory = EXCLUDED.inventory,
                weight = EXCLUDED.weight,
                is_deleted = EXCLUDED.is_deleted,
                deleted_at = EXCLUDED.deleted_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(product.is_active)
        .bind(&product.name)
        .bind(&product.slug)
        .bind(product.price.amount())
        .bind(product.sale_price.map(|p| p.amount()))
        .bind(product.sale_end_at)
        .bind(product.inventory)
        .bind(product.weight_grams)
        .bind(product.lifecycle.is_deleted)
        .bind(product.lifecycle.deleted_at)
        .bind(product.lifecycle.created_at)
        .bind(product.lifecycle.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts or replaces a user.
    pub async fn save_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, point, is_deleted, deleted_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                email = EXCLUDED.email,
                name = EXCLUDED.name,
                point = EXCLUDED.point,
                is_deleted = EXCLUDED.is_deleted,
                deleted_at = EXCLUDED.deleted_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.points)
        .bind(user.lifecycle.is_deleted)
        .bind(user.lifecycle.deleted_at)
        .bind(user.lifecycle.created_at)
        .bind(user.lifecycle.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts or replaces a promotion.
    pub async fn save_promotion(&self, promotion: &Promotion) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO promotions (id, is_active, name, description, code, kind, target, value, max_value, used_times, max_used_times, expired_at, is_deleted, deleted_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (id) DO UPDATE SET
                is_active = EXCLUDED.is_active,
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                code = EXCLUDED.code,
                kind = EXCLUDED.kind,
                target = EXCLUDED.target,
                value = EXCLUDED.value,
                max_value = EXCLUDED.max_value,
                used_times = EXCLUDED.used_times,
                max_used_times = EXCLUDED.max_used_times,
                expired_at = EXCLUDED.expired_at,
                is_deleted = EXCLUDED.is_deleted,
                deleted_at = EXCLUDED.deleted_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(promotion.id.as_uuid())
        .bind(promotion.is_active)
        .bind(&promotion.name)
        .bind(&promotion.description)
        .bind(&promotion.code)
        .bind(promotion.kind.as_str())
        .bind(promotion.target.as_str())
        .bind(promotion.value)
        .bind(promotion.max_value.map(|m| m.amount()))
        .bind(promotion.used_times)
        .bind(promotion.max_used_times)
        .bind(promotion.expired_at)
        .bind(promotion.lifecycle.is_deleted)
        .bind(promotion.lifecycle.deleted_at)
        .bind(promotion.lifecycle.created_at)
        .bind(promotion.lifecycle.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts a cart and replaces its items.
    pub async fn save_cart(&self, cart: &Cart) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO carts (id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(cart.id.as_uuid())
        .bind(cart.user_id.as_uuid())
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart.id.as_uuid())
            .execute(&mut *tx)
            .await?;

        for item in &cart.items {
            sqlx::query(
                "INSERT INTO cart_items (cart_id, product_id, quantity) VALUES ($1, $2, $3)",
            )
            .bind(cart.id.as_uuid())
            .bind(item.product_id.as_uuid())
            .bind(item.quantity)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

fn row_to_lifecycle(row: &PgRow) -> Result<Lifecycle> {
    Ok(Lifecycle {
        is_deleted: row.try_get("is_deleted")?,
        deleted_at: row.try_get("deleted_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_product(row: &PgRow) -> Result<Product> {
    Ok(Product {
        id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
        is_active: row.try_get("is_active")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        price: Money::new(row.try_get("price")?),
        sale_price: row.try_get::<Option<i64>, _>("sale_price")?.map(Money::new),
        sale_end_at: row.try_get("sale_end_at")?,
        inventory: row.try_get("inventory")?,
        weight_grams: row.try_get("weight")?,
        lifecycle: row_to_lifecycle(row)?,
    })
}

fn row_to_user(row: &PgRow) -> Result<User> {
    Ok(User {
        id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        points: row.try_get("point")?,
        lifecycle: row_to_lifecycle(row)?,
    })
}

fn row_to_promotion(row: &PgRow) -> Result<Promotion> {
    let kind: String = row.try_get("kind")?;
    let target: String = row.try_get("target")?;

    Ok(Promotion {
        id: PromotionId::from_uuid(row.try_get::<Uuid, _>("id")?),
        is_active: row.try_get("is_active")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        code: row.try_get("code")?,
        kind: kind.parse().map_err(|_| StoreError::Decode {
            column: "kind",
            value: kind.clone(),
        })?,
        target: target.parse().map_err(|_| StoreError::Decode {
            column: "target",
            value: target.clone(),
        })?,
        value: row.try_get("value")?,
        max_value: row.try_get::<Option<i64>, _>("max_value")?.map(Money::new),
        used_times: row.try_get("used_times")?,
        max_used_times: row.try_get("max_used_times")?,
        expired_at: row.try_get("expired_at")?,
        lifecycle: row_to_lifecycle(row)?,
    })
}

fn row_to_order(row: &PgRow) -> Result<Order> {
    Ok(Order {
        id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
        recipient: Recipient {
            name: row.try_get("name")?,
            phone: row.try_get("phone")?,
            email: row.try_get("email")?,
        },
        destination: Destination {
            province: row.try_get("province")?,
            district: row.try_get("district")?,
            ward: row.try_get("ward")?,
            street: row.try_get("street")?,
            address: row.try_get("address")?,
        },
        note: row.try_get("note")?,
        value: Money::new(row.try_get("value")?),
        actual_value: Money::new(row.try_get("actual_value")?),
        fee_ship: Money::new(row.try_get("fee_ship")?),
        point_used: row.try_get("point_used")?,
        point_earned: row.try_get("point_earned")?,
        promotion_id: row
            .try_get::<Option<Uuid>, _>("promotion_id")?
            .map(PromotionId::from_uuid),
        status_id: row.try_get("status_id")?,
        reason_code: row.try_get("reason_code")?,
        reason: row.try_get("reason")?,
        user_id: row
            .try_get::<Option<Uuid>, _>("user_id")?
            .map(UserId::from_uuid),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_order_line(row: &PgRow) -> Result<OrderLine> {
    Ok(OrderLine {
        id: OrderLineId::from_uuid(row.try_get::<Uuid, _>("id")?),
        order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        quantity: row.try_get("quantity")?,
        price: Money::new(row.try_get("price")?),
    })
}

#[async_trait]
impl CommerceStore for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresUnitOfWork { tx }))
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderDetails>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND is_deleted = FALSE");
        let row: Option<PgRow> = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let order = row_to_order(&row)?;

        let rows = sqlx::query(
            r#"
            SELECT id, order_id, product_id, quantity, price
            FROM order_lines
            WHERE order_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let lines = rows
            .iter()
            .map(row_to_order_line)
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(OrderDetails { order, lines }))
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let row: Option<PgRow> = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT id, email, name, point, is_deleted, deleted_at, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn find_promotion_by_code(&self, code: &str) -> Result<Option<Promotion>> {
        let sql = format!("SELECT {PROMOTION_COLUMNS} FROM promotions WHERE code = $1");
        let row: Option<PgRow> = sqlx::query(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_promotion).transpose()
    }

    #[tracing::instrument(skip(self, update), fields(order_id = %update.partner_id))]
    async fn apply_shipment_status(
        &self,
        update: &UpdateShipmentStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>> {
        // Every right-hand side reads the pre-update row.
        let sql = format!(
            r#"
            UPDATE orders SET
                value = value - fee_ship + $2,
                fee_ship = $2,
                status_id = $3,
                reason_code = $4,
                reason = $5,
                updated_at = $6
            WHERE id = $1 AND is_deleted = FALSE
            RETURNING {ORDER_COLUMNS}
            "#
        );
        let row: Option<PgRow> = sqlx::query(&sql)
            .bind(update.partner_id.as_uuid())
            .bind(update.fee)
            .bind(update.status_id)
            .bind(&update.reason_code)
            .bind(&update.reason)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_order).transpose()
    }
}

#[async_trait]
impl CartStore for PostgresStore {
    async fn find_cart(&self, user_id: UserId) -> Result<Option<Cart>> {
        let row: Option<PgRow> =
            sqlx::query("SELECT id FROM carts WHERE user_id = $1 AND is_deleted = FALSE")
                .bind(user_id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let id = CartId::from_uuid(row.try_get::<Uuid, _>("id")?);

        let rows = sqlx::query(
            "SELECT product_id, quantity FROM cart_items WHERE cart_id = $1 ORDER BY product_id",
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .iter()
            .map(|row| -> Result<CartItem> {
                Ok(CartItem {
                    product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
                    quantity: row.try_get("quantity")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(Cart { id, user_id, items }))
    }

    async fn clear_cart(&self, cart_id: CartId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

/// A unit of work backed by one PostgreSQL transaction.
///
/// Dropping it without committing rolls the transaction back.
pub struct PostgresUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    async fn lock_products(&mut self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let mut ids: Vec<Uuid> = ids.iter().map(ProductId::as_uuid).collect();
        ids.sort_unstable();
        ids.dedup();

        // Locking in id order keeps concurrent orders from deadlocking.
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE"
        );
        let rows = sqlx::query(&sql)
            .bind(ids)
            .fetch_all(&mut *self.tx)
            .await?;

        rows.iter().map(row_to_product).collect()
    }

    async fn lock_user_points(&mut self, user_id: UserId) -> Result<Option<i64>> {
        let point: Option<i64> = sqlx::query_scalar(
            "SELECT point FROM users WHERE id = $1 AND is_deleted = FALSE FOR UPDATE",
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(point)
    }

    async fn adjust_points(&mut self, user_id: UserId, delta: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users SET point = point + $2, updated_at = NOW()
            WHERE id = $1 AND point + $2 >= 0
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(delta)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn lock_promotion_by_code(&mut self, code: &str) -> Result<Option<Promotion>> {
        let sql = format!("SELECT {PROMOTION_COLUMNS} FROM promotions WHERE code = $1 FOR UPDATE");
        let row: Option<PgRow> = sqlx::query(&sql)
            .bind(code)
            .fetch_optional(&mut *self.tx)
            .await?;

        row.as_ref().map(row_to_promotion).transpose()
    }

    async fn increment_promotion_usage(&mut self, id: PromotionId) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE promotions SET used_times = used_times + 1, updated_at = NOW()
            WHERE id = $1 AND (max_used_times IS NULL OR used_times < max_used_times)
            "#,
        )
        .bind(id.as_uuid())
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, name, phone, email, province, district, ward, street, address, note, value, actual_value, fee_ship, point_used, point_earned, promotion_id, status_id, reason_code, reason, user_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(&order.recipient.name)
        .bind(&order.recipient.phone)
        .bind(&order.recipient.email)
        .bind(&order.destination.province)
        .bind(&order.destination.district)
        .bind(&order.destination.ward)
        .bind(&order.destination.street)
        .bind(&order.destination.address)
        .bind(&order.note)
        .bind(order.value.amount())
        .bind(order.actual_value.amount())
        .bind(order.fee_ship.amount())
        .bind(order.point_used)
        .bind(order.point_earned)
        .bind(order.promotion_id.map(|id| id.as_uuid()))
        .bind(order.status_id)
        .bind(&order.reason_code)
        .bind(&order.reason)
        .bind(order.user_id.map(|id| id.as_uuid()))
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn insert_order_lines(&mut self, lines: &[OrderLine]) -> Result<()> {
        // Lines keep the order they were placed in.
        for (position, line) in (0_i32..).zip(lines) {
            sqlx::query(
                r#"
                INSERT INTO order_lines (id, order_id, product_id, quantity, price, position)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(line.id.as_uuid())
            .bind(line.order_id.as_uuid())
            .bind(line.product_id.as_uuid())
            .bind(line.quantity)
            .bind(line.price.amount())
            .bind(position)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn decrement_inventory(&mut self, product_id: ProductId, quantity: i32) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE products SET inventory = inventory - $2, updated_at = NOW()
            WHERE id = $1 AND inventory >= $2
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(quantity)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_cart_id(&mut self, user_id: UserId) -> Result<Option<CartId>> {
        let id: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM carts WHERE user_id = $1 AND is_deleted = FALSE")
                .bind(user_id.as_uuid())
                .fetch_optional(&mut *self.tx)
                .await?;

        Ok(id.map(CartId::from_uuid))
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

//! Order orchestrator.
//!
//! Places an order in one unit of work: availability, pricing, loyalty,
//! promotion, persistence and stock decrement either all commit or none do.
//! Mail, cart clearing and shipment booking run afterwards through the
//! [`Outbox`].

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use common::{CartId, OrderId, ProductId, UserId};
use domain::{
    DraftItem, INITIAL_STATUS_ID, Money, Order, OrderDetails, OrderLine, PlaceOrder, Promotion,
    ShipmentDraft, UpdateShipmentStatus, points_earned, price_lines,
};
use serde::Serialize;
use store::{CommerceStore, UnitOfWork};

use crate::config::CheckoutConfig;
use crate::error::{CheckoutError, Result};
use crate::outbox::{Outbox, PostCommitTask};
use crate::services::{OrderSummary, QuoteRequest, ShippingQuote, ShippingService, SummaryLine};
use crate::{inventory, loyalty, promotions};

/// What a successful placement returns to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    pub order: Order,
    pub lines: Vec<OrderLine>,
    /// Payload for the shipping partner.
    pub shipment: ShipmentDraft,
}

/// Everything produced inside the placement transaction.
struct Placement {
    order: Order,
    lines: Vec<OrderLine>,
    shipment: ShipmentDraft,
    summary: OrderSummary,
    cart_id: Option<CartId>,
}

/// Drives order placement and the follow-up operations on placed orders.
pub struct OrderOrchestrator<S, Sh>
where
    S: CommerceStore,
    Sh: ShippingService,
{
    store: S,
    shipping: Sh,
    outbox: Outbox,
    config: CheckoutConfig,
}

impl<S, Sh> OrderOrchestrator<S, Sh>
where
    S: CommerceStore,
    Sh: ShippingService,
{
    /// Creates a new orchestrator.
    pub fn new(store: S, shipping: Sh, outbox: Outbox, config: CheckoutConfig) -> Self {
        Self {
            store,
            shipping,
            outbox,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    /// Places an order for `buyer`, or for a guest when `buyer` is `None`.
    ///
    /// Returns the persisted order and its shipment draft, or a single error
    /// with nothing persisted.
    #[tracing::instrument(skip(self, command), fields(lines = command.products.len()))]
    pub async fn place_order(
        &self,
        command: PlaceOrder,
        buyer: Option<UserId>,
    ) -> Result<PlacedOrder> {
        let started = Instant::now();
        let result = self.try_place_order(command, buyer).await;
        metrics::histogram!("order_placement_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match &result {
            Ok(placed) => {
                metrics::counter!("orders_placed_total").increment(1);
                tracing::info!(
                    order_id = %placed.order.id,
                    value = placed.order.value.amount(),
                    actual_value = placed.order.actual_value.amount(),
                    fee_ship = placed.order.fee_ship.amount(),
                    "order placed"
                );
            }
            Err(e) => {
                metrics::counter!("order_placement_failures_total", "code" => e.code())
                    .increment(1);
                if e.is_internal() {
                    tracing::error!(error = %e, "order placement failed");
                } else {
                    tracing::info!(code = e.code(), error = %e, "order rejected");
                }
            }
        }

        result
    }

    async fn try_place_order(
        &self,
        command: PlaceOrder,
        buyer: Option<UserId>,
    ) -> Result<PlacedOrder> {
        command.validate()?;
        let now = Utc::now();
        let requested = command.requested_quantities();

        // No lock is held while the partner is called.
        let quoted_fee = self.quote_before_locking(&command, &requested, now).await?;

        let mut uow = self.store.begin().await?;
        let outcome = self
            .place_in(uow.as_mut(), &command, &requested, buyer, quoted_fee, now)
            .await;
        let placement = match outcome {
            Ok(placement) => placement,
            Err(e) => {
                if let Err(rollback_err) = uow.rollback().await {
                    tracing::warn!(error = %rollback_err, "rollback failed");
                }
                return Err(e);
            }
        };
        uow.commit().await?;

        self.enqueue_post_commit(&placement);

        Ok(PlacedOrder {
            order: placement.order,
            lines: placement.lines,
            shipment: placement.shipment,
        })
    }

    /// Quotes the delivery fee from unlocked product snapshots.
    ///
    /// Fails with `ProductUnavailable` for a product that cannot cover its
    /// requested quantity, before anything is priced.
    ///
    /// Returns `None` when the pre-discount total already ships free.
    async fn quote_before_locking(
        &self,
        command: &PlaceOrder,
        requested: &BTreeMap<ProductId, i32>,
        now: DateTime<Utc>,
    ) -> Result<Option<Money>> {
        let mut products = Vec::with_capacity(requested.len());
        for (&product_id, &quantity) in requested {
            let product = self
                .store
                .get_product(product_id)
                .await?
                .filter(|product| product.can_supply(quantity))
                .ok_or(CheckoutError::ProductUnavailable(product_id))?;
            products.push((product, quantity));
        }

        let (_, total) = price_lines(products.iter().map(|(p, q)| (p, *q)), now);
        if total > self.config.pricing.free_shipping_threshold {
            return Ok(None);
        }

        let request = QuoteRequest {
            destination: command.destination.clone(),
            weight_kg: products
                .iter()
                .map(|(p, q)| p.weight_kg() * f64::from(*q))
                .sum(),
            value: total,
            deliver_option: command.deliver_option,
        };

        match self.shipping.quote(&request).await {
            Ok(quote) if !quote.deliverable => Err(CheckoutError::Undeliverable),
            Ok(quote) => Ok(Some(quote.fee)),
            Err(e) => {
                let fallback = self.config.pricing.flat_shipping_fee;
                tracing::warn!(
                    error = %e,
                    fallback = fallback.amount(),
                    "shipping quote failed, using flat fee"
                );
                Ok(Some(fallback))
            }
        }
    }

    async fn place_in(
        &self,
        uow: &mut dyn UnitOfWork,
        command: &PlaceOrder,
        requested: &BTreeMap<ProductId, i32>,
        buyer: Option<UserId>,
        quoted_fee: Option<Money>,
        now: DateTime<Utc>,
    ) -> Result<Placement> {
        let pricing = &self.config.pricing;

        // Lock and check every product.
        let products = inventory::check_availability(uow, requested).await?;

        // Price lines in request order.
        let mut priced_input = Vec::with_capacity(command.products.len());
        for line in &command.products {
            let product = products
                .get(&line.product_id)
                .ok_or(CheckoutError::ProductUnavailable(line.product_id))?;
            priced_input.push((product, line.quantity));
        }
        let (priced, total) = price_lines(priced_input, now);
        let mut actual = total;

        // Loyalty, for authenticated buyers only.
        let mut point_used = None;
        let mut point_earned = None;
        let mut cart_id = None;
        if let Some(user_id) = buyer {
            if uow.lock_user_points(user_id).await?.is_none() {
                return Err(CheckoutError::BuyerNotFound(user_id));
            }

            if let Some(points) = command.points_to_spend() {
                if points < pricing.min_point_redemption {
                    return Err(CheckoutError::PointRedemptionBelowMinimum {
                        requested: points,
                        minimum: pricing.min_point_redemption,
                    });
                }
                actual -= loyalty::redeem(uow, user_id, points, pricing).await?;
                point_used = Some(points);
                metrics::counter!("points_redeemed_total").increment(points.unsigned_abs());
            }

            let earned = points_earned(total, pricing);
            loyalty::credit(uow, user_id, earned).await?;
            if earned > 0 {
                point_earned = Some(earned);
                metrics::counter!("points_earned_total").increment(earned.unsigned_abs());
            }

            cart_id = uow.find_cart_id(user_id).await?;
        }

        // Promotion, computed on the pre-discount total.
        let mut promotion_id = None;
        let mut promotion_free_shipping = false;
        if let Some(code) = command.promotion_code() {
            let redemption = promotions::redeem(uow, code, total, now).await?;
            if redemption.discount.free_shipping {
                promotion_free_shipping = true;
            } else {
                actual -= redemption.discount.amount;
            }
            promotion_id = Some(redemption.promotion.id);
            metrics::counter!("promotions_redeemed_total").increment(1);
        }
        let actual = actual.non_negative();

        // Any free-shipping trigger wins over a quote.
        let free_shipping = total > pricing.free_shipping_threshold || promotion_free_shipping;
        let fee_ship = if free_shipping {
            Money::zero()
        } else {
            quoted_fee.unwrap_or(pricing.flat_shipping_fee)
        };

        // Persist and take stock.
        let order = Order {
            id: OrderId::new(),
            recipient: command.recipient.clone(),
            destination: command.destination.clone(),
            note: command.note.clone(),
            value: total,
            actual_value: actual,
            fee_ship,
            point_used,
            point_earned,
            promotion_id,
            status_id: INITIAL_STATUS_ID,
            reason_code: None,
            reason: None,
            user_id: buyer,
            created_at: now,
            updated_at: None,
        };
        let lines: Vec<OrderLine> = priced
            .iter()
            .map(|line| OrderLine::new(order.id, line.product_id, line.quantity, line.unit_price))
            .collect();

        uow.insert_order(&order).await?;
        uow.insert_order_lines(&lines).await?;
        inventory::decrement(uow, requested).await?;

        // Shipment payload and notification summary.
        let mut draft_items = Vec::with_capacity(lines.len());
        let mut summary_lines = Vec::with_capacity(lines.len());
        for line in &lines {
            let (name, weight_grams) = products
                .get(&line.product_id)
                .map(|p| (p.name.clone(), p.weight_grams))
                .unwrap_or_default();
            draft_items.push(DraftItem {
                name: name.clone(),
                weight_grams,
                quantity: line.quantity,
            });
            summary_lines.push(SummaryLine {
                name,
                quantity: line.quantity,
                unit_price: line.price,
                line_total: line.line_total(),
            });
        }
        let shipment = ShipmentDraft::build(
            &order,
            &draft_items,
            &self.config.pickup,
            command.deliver_option,
        );
        let summary = OrderSummary::new(&order, summary_lines);

        Ok(Placement {
            order,
            lines,
            shipment,
            summary,
            cart_id,
        })
    }

    fn enqueue_post_commit(&self, placement: &Placement) {
        self.outbox.enqueue(PostCommitTask::OrderConfirmation {
            summary: placement.summary.clone(),
        });
        self.outbox.enqueue(PostCommitTask::OperationsAlert {
            recipient: self.config.operations_email.clone(),
            summary: placement.summary.clone(),
        });
        if let Some(cart_id) = placement.cart_id {
            self.outbox.enqueue(PostCommitTask::ClearCart { cart_id });
        }
        if self.config.book_shipments {
            self.outbox.enqueue(PostCommitTask::BookShipment {
                draft: placement.shipment.clone(),
            });
        }
    }

    /// Applies a shipping partner's status callback to an order.
    #[tracing::instrument(skip(self, update), fields(order_id = %update.partner_id))]
    pub async fn update_shipment_status(&self, update: UpdateShipmentStatus) -> Result<Order> {
        update.validate()?;

        let order = self
            .store
            .apply_shipment_status(&update, Utc::now())
            .await?
            .ok_or(CheckoutError::OrderNotFound(update.partner_id))?;

        metrics::counter!("shipment_status_updates_total").increment(1);
        tracing::info!(
            status_id = order.status_id,
            fee_ship = order.fee_ship.amount(),
            "shipment status updated"
        );
        Ok(order)
    }

    /// Loads an order with its lines.
    pub async fn get_order(&self, id: OrderId) -> Result<OrderDetails> {
        self.store
            .get_order(id)
            .await?
            .ok_or(CheckoutError::OrderNotFound(id))
    }

    /// Points a purchase of `total` would earn.
    pub fn preview_points(&self, total: Money) -> i64 {
        points_earned(total, &self.config.pricing)
    }

    /// Validates a promotion code without redeeming it.
    pub async fn preview_promotion(&self, code: &str) -> Result<Promotion> {
        promotions::preview(&self.store, code, Utc::now()).await
    }

    /// Forwards a fee quote to the shipping partner.
    pub async fn quote_shipping(&self, request: &QuoteRequest) -> Result<ShippingQuote> {
        Ok(self.shipping.quote(request).await?)
    }
}

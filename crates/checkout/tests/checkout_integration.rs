//! Integration tests for order placement.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use checkout::{
    CheckoutConfig, CheckoutError, InMemoryNotificationService, InMemoryShippingService,
    OrderOrchestrator, Outbox, OutboxWorker, RetryPolicy, SentNotification,
};
use common::{OrderId, ProductId, UserId};
use domain::{
    Cart, Destination, Money, PlaceOrder, Product, Promotion, PromotionKind, PromotionTarget,
    Recipient, RequestedLine, UpdateShipmentStatus, User,
};
use store::{CartStore, CommerceStore, InMemoryStore};

type TestOrchestrator = OrderOrchestrator<InMemoryStore, InMemoryShippingService>;
type TestWorker =
    OutboxWorker<InMemoryStore, InMemoryShippingService, InMemoryNotificationService>;

struct TestHarness {
    orchestrator: Arc<TestOrchestrator>,
    worker: TestWorker,
    store: InMemoryStore,
    shipping: InMemoryShippingService,
    notifications: InMemoryNotificationService,
}

impl TestHarness {
    fn new() -> Self {
        Self::with(InMemoryShippingService::new(), CheckoutConfig::default())
    }

    fn with(shipping: InMemoryShippingService, config: CheckoutConfig) -> Self {
        let store = InMemoryStore::new();
        let notifications = InMemoryNotificationService::new();
        let (outbox, receiver) = Outbox::new();

        let orchestrator = Arc::new(OrderOrchestrator::new(
            store.clone(),
            shipping.clone(),
            outbox,
            config,
        ));
        let worker = OutboxWorker::new(
            receiver,
            store.clone(),
            shipping.clone(),
            notifications.clone(),
            RetryPolicy {
                max_attempts: 2,
                backoff: Duration::ZERO,
            },
        );

        Self {
            orchestrator,
            worker,
            store,
            shipping,
            notifications,
        }
    }

    async fn product(&self, price: i64, inventory: i32) -> Product {
        let product = Product::new("Bird nest", "bird-nest", Money::new(price), inventory, 250);
        self.store.save_product(&product).await;
        product
    }

    async fn user(&self, points: i64) -> User {
        let user = User::new("lan@example.com", "Lan", points);
        self.store.save_user(&user).await;
        user
    }

    async fn promotion(&self, promotion: Promotion) -> Promotion {
        self.store.save_promotion(&promotion).await;
        promotion
    }

    async fn inventory_of(&self, id: ProductId) -> i32 {
        self.store.get_product(id).await.unwrap().unwrap().inventory
    }

    async fn points_of(&self, id: UserId) -> i64 {
        self.store.get_user(id).await.unwrap().unwrap().points
    }

    async fn used_times_of(&self, code: &str) -> i32 {
        self.store
            .find_promotion_by_code(code)
            .await
            .unwrap()
            .unwrap()
            .used_times
    }
}

fn order_for(lines: &[(ProductId, i32)]) -> PlaceOrder {
    PlaceOrder::new(
        Recipient {
            name: "Lan".to_string(),
            phone: "0900000000".to_string(),
            email: "lan@example.com".to_string(),
        },
        Destination {
            province: "Khanh Hoa".to_string(),
            district: "Nha Trang".to_string(),
            ward: "Loc Tho".to_string(),
            street: "Tran Phu".to_string(),
            address: "1 Tran Phu".to_string(),
        },
        lines
            .iter()
            .map(|&(product_id, quantity)| RequestedLine {
                product_id,
                quantity,
            })
            .collect(),
    )
}

fn ten_percent_capped() -> Promotion {
    let mut promotion = Promotion::new(
        "TEN",
        PromotionKind::Percent,
        PromotionTarget::Product,
        10,
    );
    promotion.max_value = Some(Money::new(50_000));
    promotion
}

mod pricing {
    use super::*;

    #[tokio::test]
    async fn test_below_threshold_pays_quoted_fee() {
        let h = TestHarness::new();
        let product = h.product(500_000, 10).await;

        let placed = h
            .orchestrator
            .place_order(order_for(&[(product.id, 2)]), None)
            .await
            .unwrap();

        assert_eq!(placed.order.value, Money::new(1_000_000));
        assert_eq!(placed.order.actual_value, Money::new(1_000_000));
        assert_eq!(placed.order.fee_ship, Money::new(30_000));
        assert_eq!(h.inventory_of(product.id).await, 8);
        assert_eq!(h.store.order_line_count().await, 1);
    }

    #[tokio::test]
    async fn test_above_threshold_ships_free_without_quote() {
        let h = TestHarness::new();
        let product = h.product(1_100_000, 10).await;

        let placed = h
            .orchestrator
            .place_order(order_for(&[(product.id, 2)]), None)
            .await
            .unwrap();

        assert_eq!(placed.order.value, Money::new(2_200_000));
        assert_eq!(placed.order.fee_ship, Money::zero());
        assert_eq!(h.shipping.quote_count(), 0);
    }

    #[tokio::test]
    async fn test_exactly_at_threshold_pays_fee() {
        let h = TestHarness::new();
        let product = h.product(1_000_000, 10).await;

        let placed = h
            .orchestrator
            .place_order(order_for(&[(product.id, 2)]), None)
            .await
            .unwrap();

        assert_eq!(placed.order.fee_ship, Money::new(30_000));
    }

    #[tokio::test]
    async fn test_sale_price_is_snapshotted_on_lines() {
        let h = TestHarness::new();
        let product = Product::new("Bird nest", "bird-nest", Money::new(500_000), 10, 250)
            .with_sale(Money::new(400_000), Utc::now() + chrono::Duration::days(1));
        h.store.save_product(&product).await;

        let placed = h
            .orchestrator
            .place_order(order_for(&[(product.id, 2)]), None)
            .await
            .unwrap();

        assert_eq!(placed.lines[0].price, Money::new(400_000));
        assert_eq!(placed.order.value, Money::new(800_000));

        let stored = h.orchestrator.get_order(placed.order.id).await.unwrap();
        assert_eq!(stored.lines[0].price, Money::new(400_000));
    }

    #[tokio::test]
    async fn test_shipment_draft_carries_cash_on_delivery() {
        let h = TestHarness::new();
        let product = h.product(500_000, 10).await;

        let placed = h
            .orchestrator
            .place_order(order_for(&[(product.id, 2)]), None)
            .await
            .unwrap();

        let draft = &placed.shipment;
        assert_eq!(draft.order.pick_money, Money::new(1_030_000));
        assert_eq!(draft.order.value, Money::new(1_000_000));
        assert_eq!(draft.order.hamlet, "Khác");
        assert_eq!(draft.products.len(), 1);
        assert_eq!(draft.products[0].weight, 0.25);
        assert_eq!(draft.products[0].quantity, 2);
    }
}

mod loyalty {
    use super::*;

    #[tokio::test]
    async fn test_redeem_points_discounts_order() {
        let h = TestHarness::new();
        let product = h.product(500_000, 10).await;
        let user = h.user(50).await;

        let placed = h
            .orchestrator
            .place_order(order_for(&[(product.id, 1)]).with_points(30), Some(user.id))
            .await
            .unwrap();

        assert_eq!(placed.order.point_used, Some(30));
        assert_eq!(placed.order.actual_value, Money::new(470_000));
        assert_eq!(placed.order.point_earned, None);
        assert_eq!(h.points_of(user.id).await, 20);
    }

    #[tokio::test]
    async fn test_points_earned_on_pre_discount_total() {
        let h = TestHarness::new();
        let product = h.product(500_000, 10).await;
        let user = h.user(50).await;

        let placed = h
            .orchestrator
            .place_order(order_for(&[(product.id, 3)]).with_points(30), Some(user.id))
            .await
            .unwrap();

        // 1,500,000 earns 15 even though 1,470,000 is charged.
        assert_eq!(placed.order.point_earned, Some(15));
        assert_eq!(h.points_of(user.id).await, 50 - 30 + 15);
    }

    #[tokio::test]
    async fn test_insufficient_points_changes_nothing() {
        let h = TestHarness::new();
        let product = h.product(500_000, 10).await;
        let user = h.user(25).await;

        let err = h
            .orchestrator
            .place_order(order_for(&[(product.id, 2)]).with_points(30), Some(user.id))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::InsufficientPoints {
                requested: 30,
                available: 25
            }
        ));
        assert_eq!(h.points_of(user.id).await, 25);
        assert_eq!(h.inventory_of(product.id).await, 10);
        assert_eq!(h.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_guest_point_spend_is_ignored() {
        let h = TestHarness::new();
        let product = h.product(500_000, 10).await;

        let placed = h
            .orchestrator
            .place_order(order_for(&[(product.id, 1)]).with_points(30), None)
            .await
            .unwrap();

        assert_eq!(placed.order.point_used, None);
        assert_eq!(placed.order.actual_value, Money::new(500_000));
    }

    #[tokio::test]
    async fn test_discounts_clamp_at_zero() {
        let h = TestHarness::new();
        let product = h.product(100_000, 10).await;
        let user = h.user(100).await;
        h.promotion(Promotion::new(
            "FIFTY",
            PromotionKind::Money,
            PromotionTarget::Product,
            50_000,
        ))
        .await;

        let placed = h
            .orchestrator
            .place_order(
                order_for(&[(product.id, 1)])
                    .with_points(100)
                    .with_promotion("FIFTY"),
                Some(user.id),
            )
            .await
            .unwrap();

        assert_eq!(placed.order.actual_value, Money::zero());
        assert_eq!(placed.shipment.order.pick_money, placed.order.fee_ship);
    }
}

mod promotions {
    use super::*;

    #[tokio::test]
    async fn test_percent_promotion_capped() {
        let h = TestHarness::new();
        let product = h.product(500_000, 10).await;
        let promotion = h.promotion(ten_percent_capped()).await;

        let placed = h
            .orchestrator
            .place_order(order_for(&[(product.id, 2)]).with_promotion("TEN"), None)
            .await
            .unwrap();

        assert_eq!(placed.order.actual_value, Money::new(950_000));
        assert_eq!(placed.order.promotion_id, Some(promotion.id));
        assert_eq!(h.used_times_of("TEN").await, 1);
    }

    #[tokio::test]
    async fn test_shipping_promotion_waives_fee() {
        let h = TestHarness::new();
        let product = h.product(500_000, 10).await;
        h.promotion(Promotion::new(
            "FREESHIP",
            PromotionKind::Money,
            PromotionTarget::Shipping,
            0,
        ))
        .await;

        let placed = h
            .orchestrator
            .place_order(order_for(&[(product.id, 2)]).with_promotion("FREESHIP"), None)
            .await
            .unwrap();

        assert_eq!(placed.order.fee_ship, Money::zero());
        assert_eq!(placed.order.actual_value, Money::new(1_000_000));
        assert_eq!(h.used_times_of("FREESHIP").await, 1);
    }

    #[tokio::test]
    async fn test_exhausted_promotion_rolls_back_points() {
        let h = TestHarness::new();
        let product = h.product(500_000, 10).await;
        let user = h.user(50).await;
        let mut promotion = ten_percent_capped();
        promotion.used_times = 3;
        promotion.max_used_times = Some(3);
        h.promotion(promotion).await;

        let err = h
            .orchestrator
            .place_order(
                order_for(&[(product.id, 2)])
                    .with_points(30)
                    .with_promotion("TEN"),
                Some(user.id),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::PromotionExhausted(_)));
        assert_eq!(h.points_of(user.id).await, 50);
        assert_eq!(h.used_times_of("TEN").await, 3);
        assert_eq!(h.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_expired_promotion_rejected_with_uses_left() {
        let h = TestHarness::new();
        let product = h.product(500_000, 10).await;
        let mut promotion = ten_percent_capped();
        promotion.max_used_times = Some(5);
        promotion.expired_at = Some(Utc::now() - chrono::Duration::hours(1));
        h.promotion(promotion).await;

        let err = h
            .orchestrator
            .place_order(order_for(&[(product.id, 2)]).with_promotion("TEN"), None)
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::PromotionExpired(_)));
        assert_eq!(h.used_times_of("TEN").await, 0);
    }

    #[tokio::test]
    async fn test_unknown_code_not_found() {
        let h = TestHarness::new();
        let product = h.product(500_000, 10).await;

        let err = h
            .orchestrator
            .place_order(order_for(&[(product.id, 1)]).with_promotion("NOPE"), None)
            .await
            .unwrap_err();

        assert_eq!(err.code(), "promotion-001");
    }

    #[tokio::test]
    async fn test_preview_does_not_redeem() {
        let h = TestHarness::new();
        h.promotion(ten_percent_capped()).await;

        let promotion = h.orchestrator.preview_promotion("TEN").await.unwrap();

        assert_eq!(promotion.value, 10);
        assert_eq!(h.used_times_of("TEN").await, 0);
    }
}

mod atomicity {
    use super::*;

    #[tokio::test]
    async fn test_unavailable_product_fails_whole_batch() {
        let h = TestHarness::new();
        let plenty = h.product(100_000, 10).await;
        let scarce = h.product(100_000, 1).await;

        let err = h
            .orchestrator
            .place_order(order_for(&[(plenty.id, 2), (scarce.id, 2)]), None)
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::ProductUnavailable(id) if id == scarce.id));
        assert_eq!(h.inventory_of(plenty.id).await, 10);
        assert_eq!(h.inventory_of(scarce.id).await, 1);
    }

    #[tokio::test]
    async fn test_inactive_product_unavailable() {
        let h = TestHarness::new();
        let mut product = Product::new("Old", "old", Money::new(100_000), 10, 100);
        product.is_active = false;
        h.store.save_product(&product).await;

        let err = h
            .orchestrator
            .place_order(order_for(&[(product.id, 1)]), None)
            .await
            .unwrap_err();

        assert_eq!(err.code(), "order-001");
    }

    #[tokio::test]
    async fn test_persist_failure_rolls_back_every_mutation() {
        let h = TestHarness::new();
        let product = h.product(500_000, 10).await;
        let user = h.user(50).await;
        h.promotion(ten_percent_capped()).await;
        h.store.set_fail_on_order_insert(true);

        let err = h
            .orchestrator
            .place_order(
                order_for(&[(product.id, 2)])
                    .with_points(30)
                    .with_promotion("TEN"),
                Some(user.id),
            )
            .await
            .unwrap_err();

        assert!(err.is_internal());
        assert_eq!(err.code(), "internal-error");
        assert_eq!(h.inventory_of(product.id).await, 10);
        assert_eq!(h.points_of(user.id).await, 50);
        assert_eq!(h.used_times_of("TEN").await, 0);
        assert_eq!(h.store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_failed_order_queues_no_side_effects() {
        let mut h = TestHarness::new();
        let product = h.product(500_000, 1).await;

        let _ = h
            .orchestrator
            .place_order(order_for(&[(product.id, 2)]), None)
            .await
            .unwrap_err();

        assert_eq!(h.worker.drain().await, 0);
        assert!(h.notifications.sent().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_orders_never_oversell() {
        let h = TestHarness::new();
        let product = h.product(100_000, 5).await;

        let mut handles = Vec::new();
        for _ in 0..10 {
            let orchestrator = Arc::clone(&h.orchestrator);
            let command = order_for(&[(product.id, 1)]);
            handles.push(tokio::spawn(async move {
                orchestrator.place_order(command, None).await
            }));
        }

        let mut placed = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => placed += 1,
                Err(CheckoutError::ProductUnavailable(_)) => rejected += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(placed, 5);
        assert_eq!(rejected, 5);
        assert_eq!(h.inventory_of(product.id).await, 0);
        assert_eq!(h.store.order_count().await, 5);
    }
}

mod shipping {
    use super::*;

    #[tokio::test]
    async fn test_quote_failure_falls_back_to_flat_fee() {
        let h = TestHarness::with(
            InMemoryShippingService::with_fee(Money::new(45_000)),
            CheckoutConfig::default(),
        );
        let product = h.product(500_000, 10).await;
        h.shipping.set_fail_on_quote(true);

        let placed = h
            .orchestrator
            .place_order(order_for(&[(product.id, 1)]), None)
            .await
            .unwrap();

        assert_eq!(placed.order.fee_ship, Money::new(30_000));
    }

    #[tokio::test]
    async fn test_partner_quote_is_used() {
        let h = TestHarness::with(
            InMemoryShippingService::with_fee(Money::new(45_000)),
            CheckoutConfig::default(),
        );
        let product = h.product(500_000, 10).await;

        let placed = h
            .orchestrator
            .place_order(order_for(&[(product.id, 1)]), None)
            .await
            .unwrap();

        assert_eq!(placed.order.fee_ship, Money::new(45_000));
        assert_eq!(h.shipping.quote_count(), 1);
    }

    #[tokio::test]
    async fn test_undeliverable_destination_rejected() {
        let h = TestHarness::new();
        let product = h.product(500_000, 10).await;
        h.shipping.set_deliverable(false);

        let err = h
            .orchestrator
            .place_order(order_for(&[(product.id, 1)]), None)
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::Undeliverable));
        assert_eq!(h.inventory_of(product.id).await, 10);
    }

    #[tokio::test]
    async fn test_shipment_status_update_is_idempotent() {
        let h = TestHarness::new();
        let product = h.product(500_000, 10).await;
        let placed = h
            .orchestrator
            .place_order(order_for(&[(product.id, 2)]), None)
            .await
            .unwrap();

        let update = UpdateShipmentStatus {
            partner_id: placed.order.id,
            status_id: 3,
            reason_code: Some("123".to_string()),
            reason: Some("picked up".to_string()),
            fee: 45_000,
        };

        let first = h
            .orchestrator
            .update_shipment_status(update.clone())
            .await
            .unwrap();
        let second = h.orchestrator.update_shipment_status(update).await.unwrap();

        assert_eq!(first.fee_ship, Money::new(45_000));
        assert_eq!(first.value, Money::new(1_015_000));
        assert_eq!(second.fee_ship, first.fee_ship);
        assert_eq!(second.value, first.value);
        assert_eq!(second.status_id, 3);
    }

    #[tokio::test]
    async fn test_shipment_status_for_unknown_order() {
        let h = TestHarness::new();

        let err = h
            .orchestrator
            .update_shipment_status(UpdateShipmentStatus {
                partner_id: OrderId::new(),
                status_id: 3,
                reason_code: None,
                reason: None,
                fee: 30_000,
            })
            .await
            .unwrap_err();

        assert_eq!(err.code(), "order-002");
    }
}

mod post_commit {
    use super::*;

    #[tokio::test]
    async fn test_notifications_and_cart_clear_after_commit() {
        let mut h = TestHarness::new();
        let product = h.product(500_000, 10).await;
        let user = h.user(0).await;
        let cart = Cart::new(user.id).with_item(product.id, 2);
        h.store.save_cart(&cart).await;

        let placed = h
            .orchestrator
            .place_order(order_for(&[(product.id, 2)]), Some(user.id))
            .await
            .unwrap();

        assert_eq!(h.worker.drain().await, 3);
        assert_eq!(
            h.notifications.sent(),
            vec![
                SentNotification::Confirmation {
                    to: "lan@example.com".to_string(),
                    order_id: placed.order.id,
                },
                SentNotification::OperationsAlert {
                    to: CheckoutConfig::default().operations_email,
                    order_id: placed.order.id,
                },
            ]
        );
        let cart = h.store.find_cart(user.id).await.unwrap().unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_notification_failure_keeps_order() {
        let mut h = TestHarness::new();
        let product = h.product(500_000, 10).await;
        h.notifications.set_fail(true);

        let placed = h
            .orchestrator
            .place_order(order_for(&[(product.id, 2)]), None)
            .await
            .unwrap();

        assert_eq!(h.worker.drain().await, 0);
        // Two tasks, two attempts each.
        assert_eq!(h.notifications.attempts(), 4);
        assert!(h.orchestrator.get_order(placed.order.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_transient_notification_failure_is_retried() {
        let mut h = TestHarness::new();
        let product = h.product(500_000, 10).await;
        h.notifications.fail_next(1);

        h.orchestrator
            .place_order(order_for(&[(product.id, 2)]), None)
            .await
            .unwrap();

        assert_eq!(h.worker.drain().await, 2);
        assert_eq!(h.notifications.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_shipment_booked_when_enabled() {
        let config = CheckoutConfig {
            book_shipments: true,
            ..CheckoutConfig::default()
        };
        let mut h = TestHarness::with(InMemoryShippingService::new(), config);
        let product = h.product(500_000, 10).await;

        let placed = h
            .orchestrator
            .place_order(order_for(&[(product.id, 2)]), None)
            .await
            .unwrap();

        assert_eq!(h.worker.drain().await, 3);
        let shipments = h.shipping.shipments();
        assert_eq!(shipments.len(), 1);
        assert_eq!(shipments[0], placed.shipment);
    }

    #[tokio::test]
    async fn test_guest_order_has_no_cart_to_clear() {
        let mut h = TestHarness::new();
        let product = h.product(500_000, 10).await;

        h.orchestrator
            .place_order(order_for(&[(product.id, 1)]), None)
            .await
            .unwrap();

        assert_eq!(h.worker.drain().await, 2);
    }
}

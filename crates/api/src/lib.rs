//! HTTP API server with observability for order placement.
//!
//! Provides REST endpoints for placing orders, shipment-status callbacks and
//! read-only previews, with structured logging (tracing) and Prometheus
//! metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use checkout::{
    CheckoutConfig, NotificationService, OrderOrchestrator, Outbox, OutboxWorker, ShippingService,
};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{CartStore, CommerceStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shipping partner shared by the orchestrator and the outbox worker.
pub type SharedShipping = Arc<dyn ShippingService>;

/// Notification sender used by the outbox worker.
pub type SharedNotifications = Arc<dyn NotificationService>;

/// Outbox worker wired the way [`create_state`] wires it.
pub type AppWorker<S> = OutboxWorker<S, SharedShipping, SharedNotifications>;

/// Shared application state accessible from all handlers.
pub struct AppState<S: CommerceStore> {
    pub orchestrator: OrderOrchestrator<S, SharedShipping>,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: CommerceStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::place::<S>))
        .route("/orders/points", get(routes::orders::points::<S>))
        .route(
            "/orders/shipment-status",
            post(routes::orders::shipment_status::<S>),
        )
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/promotions/{code}/value", get(routes::promotions::value::<S>))
        .route("/shipping/fee", get(routes::shipping::fee::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the orchestrator and its outbox worker around `store`.
///
/// The worker must be run (or drained) for post-commit tasks to happen.
pub fn create_state<S>(
    store: S,
    shipping: SharedShipping,
    notifications: SharedNotifications,
    config: CheckoutConfig,
) -> (Arc<AppState<S>>, AppWorker<S>)
where
    S: CommerceStore + CartStore + Clone + 'static,
{
    let (outbox, receiver) = Outbox::new();
    let retry = config.notification_retry.clone();

    let worker = OutboxWorker::new(
        receiver,
        store.clone(),
        Arc::clone(&shipping),
        notifications,
        retry,
    );
    let orchestrator = OrderOrchestrator::new(store, shipping, outbox, config);

    (Arc::new(AppState { orchestrator }), worker)
}

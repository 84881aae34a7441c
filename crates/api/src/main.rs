//! API server entry point.

use std::sync::Arc;

use api::config::Config;
use api::{SharedNotifications, SharedShipping};
use checkout::{FlatRateShipping, HttpShippingClient, LogNotificationService};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::postgres::PgPoolOptions;
use store::{CartStore, CommerceStore, InMemoryStore, PostgresStore};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn describe_metrics() {
    metrics::describe_counter!("orders_placed_total", "Orders committed");
    metrics::describe_counter!(
        "order_placement_failures_total",
        "Order placements rejected or failed, by error code"
    );
    metrics::describe_histogram!(
        "order_placement_duration_seconds",
        metrics::Unit::Seconds,
        "Time spent placing an order"
    );
    metrics::describe_counter!("points_redeemed_total", "Loyalty points spent at checkout");
    metrics::describe_counter!("points_earned_total", "Loyalty points credited at checkout");
    metrics::describe_counter!("promotions_redeemed_total", "Promotion codes redeemed");
    metrics::describe_counter!(
        "post_commit_tasks_total",
        "Post-commit tasks processed, by task and outcome"
    );
    metrics::describe_counter!(
        "shipment_status_updates_total",
        "Shipment-status callbacks applied"
    );
}

/// Serves the API over `store` until a shutdown signal, then lets the outbox
/// finish what is queued.
async fn serve<S>(
    config: &Config,
    store: S,
    shipping: SharedShipping,
    notifications: SharedNotifications,
    metrics_handle: PrometheusHandle,
) -> Result<(), BoxError>
where
    S: CommerceStore + CartStore + Clone + 'static,
{
    let (state, worker) =
        api::create_state(store, shipping, notifications, config.checkout.clone());
    let worker_handle = tokio::spawn(worker.run());

    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router owned the last outbox sender; the worker stops once drained.
    worker_handle.await?;

    tracing::info!("server shut down gracefully");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;
    describe_metrics();

    // 3. Collaborators
    let shipping: SharedShipping = match config.shipping_client_config() {
        Some(partner) => {
            tracing::info!(base_url = %partner.base_url, "using shipping partner");
            Arc::new(HttpShippingClient::new(partner))
        }
        None => {
            tracing::info!(
                fee = config.checkout.pricing.flat_shipping_fee.amount(),
                "SHIPPING_API_URL not set, quoting flat fee"
            );
            Arc::new(FlatRateShipping::new(config.checkout.pricing.flat_shipping_fee))
        }
    };
    let notifications: SharedNotifications = Arc::new(LogNotificationService);

    // 4. Store, then serve
    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
            let store = PostgresStore::new(pool);
            store.run_migrations().await?;
            tracing::info!("connected to PostgreSQL, migrations applied");
            serve(&config, store, shipping, notifications, metrics_handle).await
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            serve(
                &config,
                InMemoryStore::new(),
                shipping,
                notifications,
                metrics_handle,
            )
            .await
        }
    }
}

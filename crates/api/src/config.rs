//! Application configuration loaded from environment variables.

use std::time::Duration;

use checkout::{CheckoutConfig, HttpShippingConfig};
use domain::Money;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `DATABASE_URL` — PostgreSQL connection string; unset runs in memory
/// - `SHIPPING_API_URL`, `SHIPPING_API_TOKEN` — shipping partner; unset
///   quotes the flat fee
/// - `BOOK_SHIPMENTS` — `true` books every placed order with the partner
/// - `OPERATIONS_EMAIL` — recipient of new-order alerts
/// - `PICKUP_NAME`, `PICKUP_TEL`, `PICKUP_ADDRESS`, `PICKUP_PROVINCE`,
///   `PICKUP_DISTRICT`, `PICKUP_WARD` — parcel origin
/// - `FREE_SHIPPING_THRESHOLD`, `FLAT_SHIPPING_FEE`, `POINT_VALUE`,
///   `EARN_THRESHOLD`, `EARN_UNIT`, `POINTS_PER_EARN_UNIT`,
///   `MIN_POINT_REDEMPTION` — pricing overrides
/// - `NOTIFICATION_MAX_ATTEMPTS`, `NOTIFICATION_BACKOFF_MS` — post-commit retries
///
/// Unparsable values fall back to their defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub shipping_api_url: Option<String>,
    pub shipping_api_token: Option<String>,
    pub checkout: CheckoutConfig,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let parsed = |key: &str| text(key).and_then(|value| value.trim().parse::<i64>().ok());
        let money = |key: &str, default: Money| parsed(key).map(Money::new).unwrap_or(default);

        let defaults = Self::default();
        let mut checkout = defaults.checkout;

        let pricing = &mut checkout.pricing;
        pricing.free_shipping_threshold =
            money("FREE_SHIPPING_THRESHOLD", pricing.free_shipping_threshold);
        pricing.flat_shipping_fee = money("FLAT_SHIPPING_FEE", pricing.flat_shipping_fee);
        pricing.point_value = money("POINT_VALUE", pricing.point_value);
        pricing.earn_threshold = money("EARN_THRESHOLD", pricing.earn_threshold);
        pricing.earn_unit = money("EARN_UNIT", pricing.earn_unit);
        pricing.points_per_earn_unit =
            parsed("POINTS_PER_EARN_UNIT").unwrap_or(pricing.points_per_earn_unit);
        pricing.min_point_redemption =
            parsed("MIN_POINT_REDEMPTION").unwrap_or(pricing.min_point_redemption);

        let pickup = &mut checkout.pickup;
        for (key, field) in [
            ("PICKUP_NAME", &mut pickup.name),
            ("PICKUP_TEL", &mut pickup.tel),
            ("PICKUP_ADDRESS", &mut pickup.address),
            ("PICKUP_PROVINCE", &mut pickup.province),
            ("PICKUP_DISTRICT", &mut pickup.district),
            ("PICKUP_WARD", &mut pickup.ward),
        ] {
            if let Some(value) = text(key) {
                *field = value;
            }
        }

        if let Some(email) = text("OPERATIONS_EMAIL") {
            checkout.operations_email = email;
        }
        checkout.book_shipments = text("BOOK_SHIPMENTS")
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(checkout.book_shipments);
        if let Some(attempts) = parsed("NOTIFICATION_MAX_ATTEMPTS")
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n > 0)
        {
            checkout.notification_retry.max_attempts = attempts;
        }
        if let Some(millis) = parsed("NOTIFICATION_BACKOFF_MS").and_then(|n| u64::try_from(n).ok())
        {
            checkout.notification_retry.backoff = Duration::from_millis(millis);
        }

        Self {
            host: text("HOST").unwrap_or(defaults.host),
            port: text("PORT")
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(defaults.port),
            log_level: text("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: text("DATABASE_URL"),
            shipping_api_url: text("SHIPPING_API_URL"),
            shipping_api_token: text("SHIPPING_API_TOKEN"),
            checkout,
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the shipping partner settings when a partner URL is configured.
    pub fn shipping_client_config(&self) -> Option<HttpShippingConfig> {
        self.shipping_api_url
            .as_ref()
            .map(|base_url| HttpShippingConfig {
                base_url: base_url.clone(),
                token: self.shipping_api_token.clone().unwrap_or_default(),
                pickup: self.checkout.pickup.clone(),
            })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            shipping_api_url: None,
            shipping_api_token: None,
            checkout: CheckoutConfig::default(),
        }
    }
}

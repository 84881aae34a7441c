//! Order commands.

use std::collections::BTreeMap;

use common::{OrderId, ProductId};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{DomainError, Money};

/// Delivery speed requested by the buyer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryOption {
    /// Standard delivery.
    #[default]
    None,
    /// Express delivery.
    Xteam,
}

impl DeliveryOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryOption::None => "none",
            DeliveryOption::Xteam => "xteam",
        }
    }
}

/// Who receives the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    pub phone: String,
    pub email: String,
}

/// Where the order is delivered.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Destination {
    pub province: String,
    pub district: String,
    pub ward: String,
    pub street: String,
    pub address: String,
}

impl Destination {
    /// Single-line form used in operations notifications.
    pub fn one_line(&self) -> String {
        format!(
            "{}, {}, {}, {}",
            self.address, self.ward, self.district, self.province
        )
    }
}

/// A requested product and quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedLine {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Command to place an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    #[serde(flatten)]
    pub recipient: Recipient,

    #[serde(flatten)]
    pub destination: Destination,

    #[serde(default)]
    pub note: Option<String>,

    #[serde(default)]
    pub deliver_option: DeliveryOption,

    /// Points the buyer wants to spend. Ignored for guests.
    #[serde(default)]
    pub point_used: Option<i64>,

    #[serde(default)]
    pub promotion_code: Option<String>,

    pub products: Vec<RequestedLine>,
}

impl PlaceOrder {
    /// Creates a command with no points, no promotion and standard delivery.
    pub fn new(recipient: Recipient, destination: Destination, products: Vec<RequestedLine>) -> Self {
        Self {
            recipient,
            destination,
            note: None,
            deliver_option: DeliveryOption::None,
            point_used: None,
            promotion_code: None,
            products,
        }
    }

    /// Sets the point spend.
    pub fn with_points(mut self, points: i64) -> Self {
        self.point_used = Some(points);
        self
    }

    /// Sets the promotion code.
    pub fn with_promotion(mut self, code: impl Into<String>) -> Self {
        self.promotion_code = Some(code.into());
        self
    }

    /// Validates field presence and quantities.
    pub fn validate(&self) -> Result<(), DomainError> {
        let required = [
            ("name", &self.recipient.name),
            ("phone", &self.recipient.phone),
            ("email", &self.recipient.email),
            ("province", &self.destination.province),
            ("district", &self.destination.district),
            ("ward", &self.destination.ward),
            ("street", &self.destination.street),
            ("address", &self.destination.address),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(DomainError::MissingField(field));
            }
        }

        if !self.recipient.email.contains('@') {
            return Err(DomainError::InvalidEmail(self.recipient.email.clone()));
        }

        if self.products.is_empty() {
            return Err(DomainError::EmptyOrder);
        }

        let mut totals: BTreeMap<ProductId, i32> = BTreeMap::new();
        for line in &self.products {
            if line.quantity <= 0 {
                return Err(DomainError::InvalidQuantity {
                    product_id: line.product_id,
                    quantity: line.quantity,
                });
            }
            let total = totals.entry(line.product_id).or_insert(0);
            *total = total
                .checked_add(line.quantity)
                .ok_or(DomainError::QuantityTooLarge(line.product_id))?;
        }

        if let Some(points) = self.point_used
            && points < 0
        {
            return Err(DomainError::InvalidPoints(points));
        }

        Ok(())
    }

    /// Total requested quantity per product, in product id order.
    ///
    /// Repeated lines for the same product are summed so availability is
    /// checked against the whole request. Sums saturate; `validate` rejects
    /// commands whose totals do not fit.
    pub fn requested_quantities(&self) -> BTreeMap<ProductId, i32> {
        let mut quantities: BTreeMap<ProductId, i32> = BTreeMap::new();
        for line in &self.products {
            let total = quantities.entry(line.product_id).or_insert(0);
            *total = total.saturating_add(line.quantity);
        }
        quantities
    }

    /// The promotion code, if a non-blank one was supplied.
    pub fn promotion_code(&self) -> Option<&str> {
        self.promotion_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }

    /// The requested point spend, if positive.
    pub fn points_to_spend(&self) -> Option<i64> {
        self.point_used.filter(|points| *points > 0)
    }
}

/// Shipment-status callback from the shipping partner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateShipmentStatus {
    /// Our order id, echoed back by the partner.
    pub partner_id: OrderId,

    #[serde(deserialize_with = "number_or_string")]
    pub status_id: i32,

    #[serde(default)]
    pub reason_code: Option<String>,

    #[serde(default)]
    pub reason: Option<String>,

    #[serde(deserialize_with = "number_or_string")]
    pub fee: i64,
}

impl UpdateShipmentStatus {
    /// Rejects negative fees.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.fee < 0 {
            return Err(DomainError::InvalidFee(self.fee));
        }
        Ok(())
    }

    pub fn fee(&self) -> Money {
        Money::new(self.fee)
    }
}

/// Partners send numeric fields either as JSON numbers or numeric strings.
fn number_or_string<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + std::str::FromStr,
    T::Err: std::fmt::Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<T> {
        Number(T),
        Text(String),
    }

    match Raw::<T>::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

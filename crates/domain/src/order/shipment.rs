//! Shipment draft handed to the shipping partner.
//!
//! Field names follow the partner's wire format.

use serde::{Deserialize, Serialize};

use super::{DeliveryOption, Order};
use crate::Money;

/// Placeholder the partner expects when the hamlet is unknown.
pub const UNKNOWN_HAMLET: &str = "Khác";

/// Where parcels are picked up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickupAddress {
    pub name: String,
    pub tel: String,
    pub address: String,
    pub province: String,
    pub district: String,
    pub ward: String,
}

impl Default for PickupAddress {
    fn default() -> Self {
        Self {
            name: "Shop".to_string(),
            tel: "0000000000".to_string(),
            address: "Warehouse".to_string(),
            province: "Khanh Hoa".to_string(),
            district: "Nha Trang".to_string(),
            ward: "Loc Tho".to_string(),
        }
    }
}

/// A parcel line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentProduct {
    pub name: String,
    /// Weight of one unit in kilograms.
    pub weight: f64,
    pub quantity: i32,
    pub product_code: usize,
}

/// The order block of a shipment draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentOrder {
    pub id: String,
    pub pick_name: String,
    pub pick_address: String,
    pub pick_province: String,
    pub pick_district: String,
    pub pick_ward: String,
    pub pick_tel: String,
    pub tel: String,
    pub name: String,
    pub address: String,
    pub province: String,
    pub district: String,
    pub ward: String,
    pub hamlet: String,
    /// 1: collect only `pick_money` from the recipient.
    pub is_freeship: u8,
    /// Cash on delivery: `actual_value + fee_ship`.
    pub pick_money: Money,
    /// Declared value: the pre-discount total.
    pub value: Money,
    pub transport: String,
    pub deliver_option: DeliveryOption,
    pub note: String,
}

/// Everything the shipping partner needs to book delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentDraft {
    pub products: Vec<ShipmentProduct>,
    pub order: ShipmentOrder,
}

/// Input for one draft line.
#[derive(Debug, Clone)]
pub struct DraftItem {
    pub name: String,
    pub weight_grams: i32,
    pub quantity: i32,
}

impl ShipmentDraft {
    /// Builds the draft for a placed order.
    pub fn build(
        order: &Order,
        items: &[DraftItem],
        pickup: &PickupAddress,
        deliver_option: DeliveryOption,
    ) -> Self {
        let products = items
            .iter()
            .enumerate()
            .map(|(index, item)| ShipmentProduct {
                name: item.name.clone(),
                weight: f64::from(item.weight_grams) / 1000.0,
                quantity: item.quantity,
                product_code: index,
            })
            .collect();

        Self {
            products,
            order: ShipmentOrder {
                id: order.id.to_string(),
                pick_name: pickup.name.clone(),
                pick_address: pickup.address.clone(),
                pick_province: pickup.province.clone(),
                pick_district: pickup.district.clone(),
                pick_ward: pickup.ward.clone(),
                pick_tel: pickup.tel.clone(),
                tel: order.recipient.phone.clone(),
                name: order.recipient.name.clone(),
                address: order.destination.address.clone(),
                province: order.destination.province.clone(),
                district: order.destination.district.clone(),
                ward: order.destination.ward.clone(),
                hamlet: UNKNOWN_HAMLET.to_string(),
                is_freeship: 1,
                pick_money: order.amount_due(),
                value: order.value,
                transport: "road".to_string(),
                deliver_option,
                note: order.note.clone().unwrap_or_default(),
            },
        }
    }

    /// Total parcel weight in kilograms.
    pub fn total_weight_kg(&self) -> f64 {
        self.products
            .iter()
            .map(|p| p.weight * f64::from(p.quantity))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use common::OrderId;

    use super::*;
    use crate::order::{Destination, INITIAL_STATUS_ID, Recipient};

    #[test]
    fn test_build_draft() {
        let order = Order {
            id: OrderId::new(),
            recipient: Recipient {
                name: "Lan".to_string(),
                phone: "0900000000".to_string(),
                email: "lan@example.com".to_string(),
            },
            destination: Destination {
                province: "Khanh Hoa".to_string(),
                district: "Nha Trang".to_string(),
                ward: "Loc Tho".to_string(),
                street: "Tran Phu".to_string(),
                address: "1 Tran Phu".to_string(),
            },
            note: Some("call first".to_string()),
            value: Money::new(1_000_000),
            actual_value: Money::new(970_000),
            fee_ship: Money::new(30_000),
            point_used: Some(30),
            point_earned: Some(10),
            promotion_id: None,
            status_id: INITIAL_STATUS_ID,
            reason_code: None,
            reason: None,
            user_id: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        let items = vec![
            DraftItem {
                name: "Bird nest".to_string(),
                weight_grams: 250,
                quantity: 2,
            },
            DraftItem {
                name: "Gift box".to_string(),
                weight_grams: 1000,
                quantity: 1,
            },
        ];

        let draft = ShipmentDraft::build(
            &order,
            &items,
            &PickupAddress::default(),
            DeliveryOption::Xteam,
        );

        assert_eq!(draft.products.len(), 2);
        assert_eq!(draft.products[1].product_code, 1);
        assert!((draft.products[0].weight - 0.25).abs() < f64::EPSILON);
        assert_eq!(draft.order.pick_money, Money::new(1_000_000));
        assert_eq!(draft.order.value, Money::new(1_000_000));
        assert_eq!(draft.order.hamlet, UNKNOWN_HAMLET);
        assert_eq!(draft.order.note, "call first");
        assert!((draft.total_weight_kg() - 1.5).abs() < 1e-9);
    }
}

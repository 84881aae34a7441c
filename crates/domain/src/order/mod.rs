//! Orders: placement commands, the persisted record and the shipment draft.

mod commands;
mod model;
mod shipment;

pub use commands::{
    DeliveryOption, Destination, PlaceOrder, Recipient, RequestedLine, UpdateShipmentStatus,
};
pub use model::{INITIAL_STATUS_ID, Order, OrderDetails, OrderLine};
pub use shipment::{
    DraftItem, PickupAddress, ShipmentDraft, ShipmentOrder, ShipmentProduct, UNKNOWN_HAMLET,
};

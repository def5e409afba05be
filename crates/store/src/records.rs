//! Row records exchanged between the domain layer and the store.
//!
//! Records are plain data. All status fields use the shared enums; the
//! store implementations are responsible for encoding them to and from
//! their storage representation.

use chrono::{DateTime, Utc};
use common::{
    AddressId, CartId, CartItemId, CartStatus, LegId, LotId, LotStatus, Money, OrderId,
    OrderItemId, OrderStatus, PaymentId, PaymentStatus, ProductId, SellerId, ShipmentId,
    ShipmentStatus, ShippingMethod, TrackingEventId, TrackingEventType, TransportMode, UserId,
};
use serde::{Deserialize, Serialize};

/// A delivery address, read-only at this boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub id: AddressId,
    pub user_id: UserId,
    pub label: String,
}

/// A shopping cart. One ACTIVE cart per user at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartRecord {
    pub id: CartId,
    pub user_id: UserId,
    pub status: CartStatus,
}

/// One cart line. `unit_price` is the snapshot taken at add-time and is
/// never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItemRecord {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub lot_id: LotId,
    pub quantity: u32,
    pub unit_price: Money,
}

/// A dated inventory lot, the unit of stock reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLotRecord {
    pub id: LotId,
    pub product_id: ProductId,
    pub seller_id: SellerId,
    /// Human-readable lot code, used in out-of-stock errors.
    pub lot_code: String,
    pub quantity_available: i64,
    pub status: LotStatus,
    pub expires_at: DateTime<Utc>,
}

/// An order header. Created once at checkout; only the status axes and
/// the visibility stamps mutate afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub order_no: String,
    pub user_id: UserId,
    pub address_id: AddressId,
    pub shipping_method: ShippingMethod,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub discount: Money,
    pub total: Money,
    pub hidden_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Immutable snapshot of a cart line at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemRecord {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub lot_id: LotId,
    pub seller_id: SellerId,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
}

/// Append-only audit row, one per accepted order-status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusHistoryRecord {
    pub order_id: OrderId,
    pub from_status: OrderStatus,
    pub to_status: OrderStatus,
    pub changed_by: Option<UserId>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A payment attempt or refund record. An order accumulates these over
/// its life; the current payment state is derived, not stored here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub provider: String,
    pub provider_ref: Option<String>,
    pub amount: Money,
    pub status: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// The shipment header, exactly one per order. Its status is derived
/// from the legs and never set by an external caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentRecord {
    pub id: ShipmentId,
    pub order_id: OrderId,
    pub status: ShipmentStatus,
}

/// One directed segment of the shipment route, ordered by `seq`.
/// Flight fields are only meaningful when `mode` is FLIGHT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentLegRecord {
    pub id: LegId,
    pub shipment_id: ShipmentId,
    pub seq: i32,
    pub mode: TransportMode,
    pub status: ShipmentStatus,
    pub from_name: String,
    pub to_name: String,
    pub flight_no: Option<String>,
    pub depart_at: Option<DateTime<Utc>>,
    pub arrive_at: Option<DateTime<Utc>>,
    pub meta: Option<serde_json::Value>,
}

/// Append-only, customer-visible tracking event. Never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingEventRecord {
    pub id: TrackingEventId,
    pub order_id: OrderId,
    pub event_type: TrackingEventType,
    pub message: Option<String>,
    pub meta: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracking_event_serialization_roundtrip() {
        let event = TrackingEventRecord {
            id: TrackingEventId::new(),
            order_id: OrderId::new(),
            event_type: TrackingEventType::OrderCreated,
            message: Some("order created".to_string()),
            meta: serde_json::json!({"source": "checkout"}),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: TrackingEventRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }

    #[test]
    fn order_record_serializes_statuses_on_the_wire() {
        let order = OrderRecord {
            id: OrderId::new(),
            order_no: "OR260830-AB12CD".to_string(),
            user_id: UserId::new(),
            address_id: AddressId::new(),
            shipping_method: ShippingMethod::Air,
            payment_status: PaymentStatus::Pending,
            order_status: OrderStatus::Confirmed,
            subtotal: Money::from_units(300),
            delivery_fee: Money::from_units(260),
            discount: Money::zero(),
            total: Money::from_units(560),
            hidden_at: None,
            deleted_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["order_status"], "CONFIRMED");
        assert_eq!(json["payment_status"], "PENDING");
        assert_eq!(json["shipping_method"], "AIR");
    }
}

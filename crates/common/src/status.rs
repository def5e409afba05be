//! Status enums and their pure lookup tables.
//!
//! The order-status legality check and the shipment-status ranking are
//! plain tables on the enums; nothing here touches storage.

use serde::{Deserialize, Serialize};

/// Error returned when decoding a status string from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: String,
}

impl std::fmt::Display for UnknownValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown {} value: {}", self.kind, self.value)
    }
}

impl std::error::Error for UnknownValue {}

macro_rules! status_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal, { $($(#[$vmeta:meta])* $variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl $name {
            /// Returns the wire/storage representation.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownValue;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok(Self::$variant),)+
                    other => Err(UnknownValue {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

status_enum!(
    /// Lifecycle of a shopping cart.
    CartStatus, "cart status", {
        Active => "ACTIVE",
        CheckedOut => "CHECKED_OUT",
    }
);

status_enum!(
    /// Lifecycle of an inventory lot. Only ACTIVE lots can be reserved.
    LotStatus, "lot status", {
        Active => "ACTIVE",
        Expired => "EXPIRED",
        Suspended => "SUSPENDED",
    }
);

status_enum!(
    /// Shipping method chosen at checkout. AUTO is resolved by policy
    /// before any fee or route is derived.
    ShippingMethod, "shipping method", {
        Auto => "AUTO",
        Ground => "GROUND",
        Air => "AIR",
    }
);

status_enum!(
    /// Order fulfillment status, one axis of the order state machine.
    OrderStatus, "order status", {
        Confirmed => "CONFIRMED",
        Preparing => "PREPARING",
        Shipped => "SHIPPED",
        Delivered => "DELIVERED",
        Cancelled => "CANCELLED",
    }
);

status_enum!(
    /// Payment status, the other axis. Used both on the order and on
    /// individual payment rows.
    PaymentStatus, "payment status", {
        Pending => "PENDING",
        Paid => "PAID",
        Refunded => "REFUNDED",
        Failed => "FAILED",
    }
);

status_enum!(
    /// Status of one shipment leg, and of the shipment overall.
    ShipmentStatus, "shipment status", {
        Planned => "PLANNED",
        PickedUp => "PICKED_UP",
        InTransit => "IN_TRANSIT",
        OutForDelivery => "OUT_FOR_DELIVERY",
        Delivered => "DELIVERED",
        Failed => "FAILED",
    }
);

status_enum!(
    /// Transport mode of a shipment leg.
    TransportMode, "transport mode", {
        Truck => "TRUCK",
        Flight => "FLIGHT",
    }
);

status_enum!(
    /// Customer-visible tracking event types.
    TrackingEventType, "tracking event type", {
        OrderCreated => "ORDER_CREATED",
        PaymentPending => "PAYMENT_PENDING",
        PaymentConfirmed => "PAYMENT_CONFIRMED",
        Preparing => "PREPARING",
        PickedUp => "PICKED_UP",
        InTransit => "IN_TRANSIT",
        OutForDelivery => "OUT_FOR_DELIVERY",
        Delivered => "DELIVERED",
        Cancelled => "CANCELLED",
        RefundRequested => "REFUND_REQUESTED",
        Refunded => "REFUNDED",
        Note => "NOTE",
    }
);

impl OrderStatus {
    /// The fixed transition table. Every accepted transition must be an
    /// edge listed here.
    pub fn successors(&self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Confirmed => &[OrderStatus::Preparing, OrderStatus::Cancelled],
            OrderStatus::Preparing => &[OrderStatus::Shipped],
            OrderStatus::Shipped => &[OrderStatus::Delivered],
            OrderStatus::Delivered => &[],
            OrderStatus::Cancelled => &[],
        }
    }

    /// Returns true if `to` is a legal successor of this status.
    pub fn can_transition_to(&self, to: OrderStatus) -> bool {
        self.successors().contains(&to)
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl ShipmentStatus {
    /// Progress rank used when aggregating leg statuses into the overall
    /// shipment status. FAILED is handled separately and has no rank.
    pub fn rank(&self) -> u8 {
        match self {
            ShipmentStatus::Planned => 0,
            ShipmentStatus::PickedUp => 1,
            ShipmentStatus::InTransit => 2,
            ShipmentStatus::OutForDelivery => 3,
            ShipmentStatus::Delivered => 4,
            ShipmentStatus::Failed => u8::MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn transition_table_matches_fixed_edges() {
        assert!(OrderStatus::Confirmed.can_transition_to(OrderStatus::Preparing));
        assert!(OrderStatus::Confirmed.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Confirmed.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Preparing.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Preparing.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Delivered));
        assert!(OrderStatus::Delivered.successors().is_empty());
        assert!(OrderStatus::Cancelled.successors().is_empty());
    }

    #[test]
    fn terminal_states() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Shipped.is_terminal());
    }

    #[test]
    fn shipment_rank_ordering() {
        assert!(ShipmentStatus::Planned.rank() < ShipmentStatus::PickedUp.rank());
        assert!(ShipmentStatus::PickedUp.rank() < ShipmentStatus::InTransit.rank());
        assert!(ShipmentStatus::InTransit.rank() < ShipmentStatus::OutForDelivery.rank());
        assert!(ShipmentStatus::OutForDelivery.rank() < ShipmentStatus::Delivered.rank());
    }

    #[test]
    fn wire_format_roundtrip() {
        assert_eq!(ShipmentStatus::OutForDelivery.as_str(), "OUT_FOR_DELIVERY");
        assert_eq!(
            ShipmentStatus::from_str("OUT_FOR_DELIVERY").unwrap(),
            ShipmentStatus::OutForDelivery
        );
        assert_eq!(
            TrackingEventType::from_str("REFUND_REQUESTED").unwrap(),
            TrackingEventType::RefundRequested
        );
        assert!(OrderStatus::from_str("SHIPPING").is_err());
    }

    #[test]
    fn serde_uses_screaming_snake_case() {
        let json = serde_json::to_string(&TrackingEventType::OrderCreated).unwrap();
        assert_eq!(json, "\"ORDER_CREATED\"");
        let back: OrderStatus = serde_json::from_str("\"PREPARING\"").unwrap();
        assert_eq!(back, OrderStatus::Preparing);
    }
}

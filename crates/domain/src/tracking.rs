//! Tracking-event construction and the status-to-event mappings.
//!
//! The ledger itself is append-only storage; this module only builds the
//! rows and knows which event type each status change maps to.

use chrono::Utc;
use common::{OrderId, OrderStatus, ShipmentStatus, TrackingEventId, TrackingEventType};
use store::TrackingEventRecord;

/// Builds a tracking event row stamped now.
pub fn event(
    order_id: OrderId,
    event_type: TrackingEventType,
    message: Option<String>,
    meta: serde_json::Value,
) -> TrackingEventRecord {
    TrackingEventRecord {
        id: TrackingEventId::new(),
        order_id,
        event_type,
        message,
        meta,
        created_at: Utc::now(),
    }
}

/// Maps an accepted order-status transition target to the event shown to
/// the customer. CONFIRMED is never a transition target, so it has no
/// mapping.
pub fn order_event_for(to: OrderStatus) -> Option<TrackingEventType> {
    match to {
        OrderStatus::Preparing => Some(TrackingEventType::Preparing),
        OrderStatus::Shipped => Some(TrackingEventType::InTransit),
        OrderStatus::Delivered => Some(TrackingEventType::Delivered),
        OrderStatus::Cancelled => Some(TrackingEventType::Cancelled),
        OrderStatus::Confirmed => None,
    }
}

/// Maps a leg status to its tracking event type. FAILED has no dedicated
/// type; the aggregator records a NOTE instead.
pub fn leg_event_for(status: ShipmentStatus) -> Option<TrackingEventType> {
    match status {
        ShipmentStatus::PickedUp => Some(TrackingEventType::PickedUp),
        ShipmentStatus::InTransit => Some(TrackingEventType::InTransit),
        ShipmentStatus::OutForDelivery => Some(TrackingEventType::OutForDelivery),
        ShipmentStatus::Delivered => Some(TrackingEventType::Delivered),
        ShipmentStatus::Planned | ShipmentStatus::Failed => None,
    }
}

/// Default customer-facing message for a leg event.
pub fn default_leg_message(event_type: TrackingEventType) -> &'static str {
    match event_type {
        TrackingEventType::PickedUp => "Package picked up",
        TrackingEventType::InTransit => "Package in transit",
        TrackingEventType::OutForDelivery => "Out for delivery",
        TrackingEventType::Delivered => "Delivered",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_status_mapping() {
        assert_eq!(
            order_event_for(OrderStatus::Shipped),
            Some(TrackingEventType::InTransit)
        );
        assert_eq!(
            order_event_for(OrderStatus::Cancelled),
            Some(TrackingEventType::Cancelled)
        );
        assert_eq!(order_event_for(OrderStatus::Confirmed), None);
    }

    #[test]
    fn leg_status_mapping() {
        assert_eq!(
            leg_event_for(ShipmentStatus::OutForDelivery),
            Some(TrackingEventType::OutForDelivery)
        );
        assert_eq!(leg_event_for(ShipmentStatus::Failed), None);
        assert_eq!(leg_event_for(ShipmentStatus::Planned), None);
    }

    #[test]
    fn event_carries_meta() {
        let order_id = OrderId::new();
        let e = event(
            order_id,
            TrackingEventType::Note,
            Some("note".to_string()),
            serde_json::json!({"k": 1}),
        );
        assert_eq!(e.order_id, order_id);
        assert_eq!(e.meta["k"], 1);
    }
}

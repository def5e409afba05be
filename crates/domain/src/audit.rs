//! Bundles an order mutation with the audit rows it must produce.
//!
//! Every status change carries its history row and tracking events in
//! one value that is applied to the transaction in a single step, so a
//! mutation cannot be committed with its audit trail forgotten.

use chrono::Utc;
use common::{OrderStatus, TrackingEventType, UserId};
use store::{OrderRecord, OrderStatusHistoryRecord, StoreTx, TrackingEventRecord};

use crate::Result;
use crate::tracking;

pub(crate) struct OrderMutation {
    order: OrderRecord,
    history: Option<OrderStatusHistoryRecord>,
    events: Vec<TrackingEventRecord>,
}

impl OrderMutation {
    /// Starts a mutation from the order's current state. `updated_at` is
    /// stamped here so the header, history, and events share one clock
    /// reading.
    pub(crate) fn of(mut order: OrderRecord) -> Self {
        order.updated_at = Utc::now();
        Self {
            order,
            history: None,
            events: Vec::new(),
        }
    }

    pub(crate) fn order_mut(&mut self) -> &mut OrderRecord {
        &mut self.order
    }

    /// Moves the order to `to` and records the history row for the edge.
    pub(crate) fn transition_to(
        mut self,
        to: OrderStatus,
        changed_by: Option<UserId>,
        note: Option<String>,
    ) -> Self {
        let from = self.order.order_status;
        self.order.order_status = to;
        self.history = Some(OrderStatusHistoryRecord {
            order_id: self.order.id,
            from_status: from,
            to_status: to,
            changed_by,
            note,
            created_at: self.order.updated_at,
        });
        self
    }

    pub(crate) fn with_event(
        mut self,
        event_type: TrackingEventType,
        message: Option<String>,
        meta: serde_json::Value,
    ) -> Self {
        self.events
            .push(tracking::event(self.order.id, event_type, message, meta));
        self
    }

    /// Writes the header, history row, and tracking events through the
    /// transaction, returning the mutated order.
    pub(crate) async fn apply(self, tx: &mut (dyn StoreTx + '_)) -> Result<OrderRecord> {
        tx.update_order(&self.order).await?;
        if let Some(row) = &self.history {
            tx.insert_status_history(row).await?;
        }
        for event in &self.events {
            tx.insert_tracking_event(event).await?;
        }
        Ok(self.order)
    }
}

//! Shipment-leg transitions and aggregation into the overall status.
//!
//! Leg updates come from riders and admins; the shipment's own status is
//! always recomputed from the legs, never set directly. When the overall
//! status advances, the order status is synchronized in the same
//! transaction.

use chrono::{DateTime, Utc};
use common::{
    LegId, OrderId, OrderStatus, ShipmentId, ShipmentStatus, TrackingEventType, TransportMode,
    UserId,
};
use serde::{Deserialize, Serialize};
use store::{FulfillmentStore, ShipmentLegRecord, ShipmentRecord, StoreTx};

use crate::error::{FulfillmentError, Result};
use crate::tracking;

/// The authenticated caller of a leg transition. Role gating (ADMIN or
/// RIDER) happens at the transport layer; the actor here is recorded in
/// the tracking metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Option<UserId>,
    pub role: Option<String>,
}

/// Requested change to one shipment leg. Absent optional fields leave
/// the leg's current values untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegTransition {
    pub status: ShipmentStatus,
    pub note: Option<String>,
    pub flight_no: Option<String>,
    pub depart_at: Option<DateTime<Utc>>,
    pub arrive_at: Option<DateTime<Utc>>,
    pub meta: Option<serde_json::Value>,
}

impl LegTransition {
    /// A plain status change with no flight fields, note, or metadata.
    pub fn to_status(status: ShipmentStatus) -> Self {
        Self {
            status,
            note: None,
            flight_no: None,
            depart_at: None,
            arrive_at: None,
            meta: None,
        }
    }
}

/// Result of a leg transition. `idempotent` is true when the call was a
/// replay and nothing was written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegTransitionOutcome {
    pub shipment_id: ShipmentId,
    pub shipment_status: ShipmentStatus,
    pub updated_leg: ShipmentLegRecord,
    pub idempotent: bool,
}

/// A shipment with its route, legs ordered by sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentDetails {
    pub shipment: ShipmentRecord,
    pub legs: Vec<ShipmentLegRecord>,
}

/// Computes the overall shipment status from its legs.
///
/// FAILED if any leg failed; DELIVERED only once every leg is delivered.
/// Otherwise the maximum-rank status among the legs still under way, so
/// a finished first hop never masks the progress of the rest of the
/// route.
pub fn overall_status(legs: &[ShipmentLegRecord]) -> ShipmentStatus {
    if legs.iter().any(|l| l.status == ShipmentStatus::Failed) {
        return ShipmentStatus::Failed;
    }
    if !legs.is_empty()
        && legs.iter().all(|l| l.status == ShipmentStatus::Delivered)
    {
        return ShipmentStatus::Delivered;
    }
    legs.iter()
        .map(|l| l.status)
        .filter(|s| *s != ShipmentStatus::Delivered)
        .max_by_key(|s| s.rank())
        .unwrap_or(ShipmentStatus::Planned)
}

/// Applies leg transitions and keeps shipment and order status in sync.
pub struct ShipmentService<S: FulfillmentStore> {
    store: S,
}

impl<S: FulfillmentStore> ShipmentService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the shipment and legs for an order the user owns.
    #[tracing::instrument(skip(self))]
    pub async fn shipment_for(&self, user_id: UserId, order_id: OrderId) -> Result<ShipmentDetails> {
        let mut tx = self.store.begin().await?;
        tx.find_order_for_user(user_id, order_id)
            .await?
            .ok_or(FulfillmentError::NotFound("order"))?;
        let shipment = tx
            .find_shipment_by_order(order_id)
            .await?
            .ok_or(FulfillmentError::NotFound("shipment"))?;
        let legs = tx.shipment_legs(shipment.id).await?;
        tx.rollback().await?;
        Ok(ShipmentDetails { shipment, legs })
    }

    /// Transitions one leg and recomputes the overall shipment status.
    ///
    /// Replaying the same transition (same status, flight fields, and
    /// metadata, no note) writes nothing and returns `idempotent=true`.
    #[tracing::instrument(skip(self, input))]
    pub async fn transition_leg(
        &self,
        order_id: OrderId,
        leg_id: LegId,
        input: LegTransition,
        actor: Actor,
    ) -> Result<LegTransitionOutcome> {
        let mut tx = self.store.begin().await?;

        let shipment = tx
            .find_shipment_by_order(order_id)
            .await?
            .ok_or(FulfillmentError::NotFound("shipment"))?;
        let legs = tx.shipment_legs(shipment.id).await?;
        let leg = legs
            .iter()
            .find(|l| l.id == leg_id)
            .cloned()
            .ok_or(FulfillmentError::NotFound("shipment leg"))?;

        let has_flight_fields =
            input.flight_no.is_some() || input.depart_at.is_some() || input.arrive_at.is_some();
        if has_flight_fields && leg.mode != TransportMode::Flight {
            return Err(FulfillmentError::BadRequest(
                "flight fields are only allowed on FLIGHT legs".to_string(),
            ));
        }

        // Absent input fields mean "leave unchanged".
        let next_flight_no = input.flight_no.clone().or_else(|| leg.flight_no.clone());
        let next_depart_at = input.depart_at.or(leg.depart_at);
        let next_arrive_at = input.arrive_at.or(leg.arrive_at);
        let next_meta = input.meta.clone().or_else(|| leg.meta.clone());

        if let (Some(depart), Some(arrive)) = (next_depart_at, next_arrive_at) {
            if arrive < depart {
                return Err(FulfillmentError::BadRequest(
                    "arriveAt must not precede departAt".to_string(),
                ));
            }
        }

        let status_same = leg.status == input.status;
        let flight_same = next_flight_no == leg.flight_no
            && next_depart_at == leg.depart_at
            && next_arrive_at == leg.arrive_at;
        let meta_same = next_meta == leg.meta;

        if status_same && flight_same && meta_same && input.note.is_none() {
            tx.rollback().await?;
            metrics::counter!("shipment_leg_replays_total").increment(1);
            return Ok(LegTransitionOutcome {
                shipment_id: shipment.id,
                shipment_status: shipment.status,
                updated_leg: leg,
                idempotent: true,
            });
        }

        let mut updated = leg.clone();
        updated.status = input.status;
        updated.flight_no = next_flight_no;
        updated.depart_at = next_depart_at;
        updated.arrive_at = next_arrive_at;
        updated.meta = next_meta;
        tx.update_leg(&updated).await?;

        let next_legs: Vec<ShipmentLegRecord> = legs
            .iter()
            .map(|l| if l.id == leg_id { updated.clone() } else { l.clone() })
            .collect();
        let overall = overall_status(&next_legs);
        tx.update_shipment_status(shipment.id, overall).await?;

        sync_order_status(tx.as_mut(), order_id, overall).await?;

        let leg_meta = serde_json::json!({
            "shipmentId": shipment.id,
            "legId": updated.id,
            "seq": updated.seq,
            "mode": updated.mode,
            "fromStatus": leg.status,
            "toStatus": updated.status,
            "flightNo": updated.flight_no,
            "departAt": updated.depart_at,
            "arriveAt": updated.arrive_at,
            "actor": actor,
        });

        if !status_same {
            if let Some(event_type) = tracking::leg_event_for(updated.status) {
                // DELIVERED is only announced once the whole route is
                // done, and at most once per order; the order sync above
                // already recorded it in that case.
                let suppress = event_type == TrackingEventType::Delivered
                    && (overall != ShipmentStatus::Delivered
                        || tx.has_tracking_event(order_id, TrackingEventType::Delivered).await?);
                if !suppress {
                    tx.insert_tracking_event(&tracking::event(
                        order_id,
                        event_type,
                        Some(
                            input
                                .note
                                .clone()
                                .unwrap_or_else(|| tracking::default_leg_message(event_type).to_string()),
                        ),
                        leg_meta.clone(),
                    ))
                    .await?;
                }
            } else if updated.status == ShipmentStatus::Failed {
                tx.insert_tracking_event(&tracking::event(
                    order_id,
                    TrackingEventType::Note,
                    Some(
                        input
                            .note
                            .clone()
                            .unwrap_or_else(|| "Delivery problem on a shipment leg".to_string()),
                    ),
                    leg_meta.clone(),
                ))
                .await?;
            }
        } else if !flight_same {
            // Flight reschedule without a status change.
            tx.insert_tracking_event(&tracking::event(
                order_id,
                TrackingEventType::Note,
                Some(
                    input
                        .note
                        .clone()
                        .unwrap_or_else(|| "Flight details updated".to_string()),
                ),
                leg_meta,
            ))
            .await?;
        }

        tx.commit().await?;
        metrics::counter!("shipment_leg_transitions_total", "to" => updated.status.as_str())
            .increment(1);

        Ok(LegTransitionOutcome {
            shipment_id: shipment.id,
            shipment_status: overall,
            updated_leg: updated,
            idempotent: false,
        })
    }
}

/// Mirrors the overall shipment status onto the order. Mid-route
/// statuses mean SHIPPED; DELIVERED closes the order with at most one
/// DELIVERED tracking event per order.
async fn sync_order_status(
    tx: &mut (dyn StoreTx + '_),
    order_id: OrderId,
    overall: ShipmentStatus,
) -> Result<()> {
    let Some(mut order) = tx.find_order(order_id).await? else {
        return Ok(());
    };

    match overall {
        ShipmentStatus::PickedUp | ShipmentStatus::InTransit | ShipmentStatus::OutForDelivery => {
            if order.order_status != OrderStatus::Shipped {
                order.order_status = OrderStatus::Shipped;
                order.updated_at = Utc::now();
                tx.update_order(&order).await?;
            }
        }
        ShipmentStatus::Delivered => {
            if order.order_status != OrderStatus::Delivered {
                order.order_status = OrderStatus::Delivered;
                order.updated_at = Utc::now();
                tx.update_order(&order).await?;
            }
            if !tx
                .has_tracking_event(order_id, TrackingEventType::Delivered)
                .await?
            {
                tx.insert_tracking_event(&tracking::event(
                    order_id,
                    TrackingEventType::Delivered,
                    Some("Delivered".to_string()),
                    serde_json::Value::Null,
                ))
                .await?;
            }
        }
        ShipmentStatus::Planned | ShipmentStatus::Failed => {}
    }
    Ok(())
}

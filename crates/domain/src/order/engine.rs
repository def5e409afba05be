//! The order lifecycle engine.
//!
//! Every public operation opens exactly one store transaction and either
//! commits all of its writes or none of them. Idempotent replays (cancel
//! on a cancelled order, refund on a refunded order) return the current
//! state without writing anything.

use chrono::{Duration, Utc};
use common::{
    AddressId, LegId, Money, OrderId, OrderItemId, OrderStatus, PaymentStatus, ShipmentId,
    ShipmentStatus, ShippingMethod, TrackingEventType, TransportMode, UserId,
};
use serde::{Deserialize, Serialize};
use store::{
    FulfillmentStore, OrderItemRecord, OrderRecord, OrderStatusHistoryRecord, PaymentRecord,
    ShipmentLegRecord, ShipmentRecord, TrackingEventRecord,
};

use crate::audit::OrderMutation;
use crate::error::{FulfillmentError, Result};
use crate::tracking;

use super::number::generate_order_no;
use super::pricing::{FlatRateCard, RateCard, ShippingPolicy};

/// An order with its line items and payment attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetails {
    pub order: OrderRecord,
    pub items: Vec<OrderItemRecord>,
    pub payments: Vec<PaymentRecord>,
}

/// Options for listing a user's orders. Pages are 1-based.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListOptions {
    pub include_hidden: bool,
    pub page: u32,
    pub limit: u32,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            include_hidden: false,
            page: 1,
            limit: 10,
        }
    }
}

/// The customer-facing timeline view: current status plus the tracking
/// ledger, oldest event first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderTimeline {
    pub order_id: OrderId,
    pub order_no: String,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub events: Vec<TrackingEventRecord>,
}

/// Drives checkout, status transitions, cancellation, refund, visibility
/// flags, and the retention purge.
pub struct OrderEngine<S: FulfillmentStore> {
    store: S,
    rate_card: Box<dyn RateCard>,
    shipping_policy: ShippingPolicy,
}

impl<S: FulfillmentStore> OrderEngine<S> {
    /// Creates an engine with the default flat-rate card and shipping
    /// policy.
    pub fn new(store: S) -> Self {
        Self::with_pricing(store, Box::new(FlatRateCard::default()), ShippingPolicy::default())
    }

    /// Creates an engine with explicit pricing and routing policy.
    pub fn with_pricing(
        store: S,
        rate_card: Box<dyn RateCard>,
        shipping_policy: ShippingPolicy,
    ) -> Self {
        Self {
            store,
            rate_card,
            shipping_policy,
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Converts the user's ACTIVE cart into a CONFIRMED order.
    ///
    /// Reserves stock with a conditional decrement per lot; any lot with
    /// insufficient quantity aborts the whole transaction, so stock is
    /// never partially reserved. Also creates the initial shipment route,
    /// the first history row, and the first three tracking events.
    #[tracing::instrument(skip(self))]
    pub async fn checkout(
        &self,
        user_id: UserId,
        address_id: AddressId,
        requested_method: ShippingMethod,
        surcharge: Money,
    ) -> Result<OrderDetails> {
        let mut tx = self.store.begin().await?;

        let address = tx
            .find_address(user_id, address_id)
            .await?
            .ok_or(FulfillmentError::NotFound("address"))?;
        let cart = tx
            .find_active_cart(user_id)
            .await?
            .ok_or(FulfillmentError::NotFound("cart"))?;

        let lines = tx.cart_items_with_lots(cart.id).await?;
        if lines.is_empty() {
            return Err(FulfillmentError::InvalidState("cart is empty".to_string()));
        }
        for (item, _) in &lines {
            if item.quantity == 0 {
                return Err(FulfillmentError::BadRequest(format!(
                    "invalid quantity for lot {}",
                    item.lot_id
                )));
            }
        }

        // Dropping the transaction on the error path rolls back every
        // reservation made so far.
        for (item, lot) in &lines {
            if !tx.reserve_stock(item.lot_id, item.quantity).await? {
                metrics::counter!("checkout_out_of_stock_total").increment(1);
                return Err(FulfillmentError::OutOfStock {
                    lot_code: lot.lot_code.clone(),
                });
            }
        }

        let method = self.shipping_policy.resolve(requested_method);
        let delivery_fee = self.rate_card.delivery_fee(method, surcharge);
        let subtotal: Money = lines
            .iter()
            .map(|(item, _)| item.unit_price.multiply(item.quantity))
            .sum();
        let discount = Money::zero();
        let total = subtotal + delivery_fee - discount;

        let now = Utc::now();
        let order = OrderRecord {
            id: OrderId::new(),
            order_no: generate_order_no(now),
            user_id,
            address_id,
            shipping_method: method,
            payment_status: PaymentStatus::Pending,
            order_status: OrderStatus::Confirmed,
            subtotal,
            delivery_fee,
            discount,
            total,
            hidden_at: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        let items: Vec<OrderItemRecord> = lines
            .iter()
            .map(|(item, lot)| OrderItemRecord {
                id: OrderItemId::new(),
                order_id: order.id,
                product_id: item.product_id,
                lot_id: item.lot_id,
                seller_id: lot.seller_id,
                quantity: item.quantity,
                unit_price: item.unit_price,
                line_total: item.unit_price.multiply(item.quantity),
            })
            .collect();
        tx.insert_order(&order, &items).await?;

        tx.insert_status_history(&OrderStatusHistoryRecord {
            order_id: order.id,
            from_status: OrderStatus::Confirmed,
            to_status: OrderStatus::Confirmed,
            changed_by: Some(user_id),
            note: Some("created".to_string()),
            created_at: now,
        })
        .await?;

        let shipment = ShipmentRecord {
            id: ShipmentId::new(),
            order_id: order.id,
            status: ShipmentStatus::Planned,
        };
        let legs = plan_route(shipment.id, method, &address.label);
        tx.insert_shipment(&shipment, &legs).await?;

        tx.insert_tracking_event(&tracking::event(
            order.id,
            TrackingEventType::OrderCreated,
            Some("Order created".to_string()),
            serde_json::json!({ "orderNo": order.order_no }),
        ))
        .await?;
        tx.insert_tracking_event(&tracking::event(
            order.id,
            TrackingEventType::PaymentPending,
            Some("Awaiting payment".to_string()),
            serde_json::Value::Null,
        ))
        .await?;
        tx.insert_tracking_event(&tracking::event(
            order.id,
            TrackingEventType::Note,
            Some(format!("Shipping via {method}")),
            serde_json::json!({
                "shippingMethod": method,
                "deliveryFee": delivery_fee,
                "subtotal": subtotal,
                "total": total,
            }),
        ))
        .await?;

        tx.delete_cart_items(cart.id).await?;
        tx.commit().await?;

        metrics::counter!("orders_checked_out_total").increment(1);
        tracing::info!(order_id = %order.id, order_no = %order.order_no, "order created");

        Ok(OrderDetails {
            order,
            items,
            payments: Vec::new(),
        })
    }

    /// Returns an order with items and payments. `NotFound` if the order
    /// is absent, soft-deleted, or owned by someone else.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, user_id: UserId, order_id: OrderId) -> Result<OrderDetails> {
        let mut tx = self.store.begin().await?;
        let order = tx
            .find_order_for_user(user_id, order_id)
            .await?
            .ok_or(FulfillmentError::NotFound("order"))?;
        let items = tx.order_items(order_id).await?;
        let payments = tx.payments_for_order(order_id).await?;
        tx.rollback().await?;
        Ok(OrderDetails {
            order,
            items,
            payments,
        })
    }

    /// Lists the user's orders, newest first. Hidden orders are excluded
    /// unless requested; soft-deleted orders are never returned.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(
        &self,
        user_id: UserId,
        options: ListOptions,
    ) -> Result<Vec<OrderRecord>> {
        let page = options.page.max(1);
        let limit = options.limit.max(1);
        // Saturates instead of overflowing on absurd page numbers; a
        // page past the end is simply empty.
        let offset = (page - 1).saturating_mul(limit);

        let mut tx = self.store.begin().await?;
        let orders = tx
            .list_orders_for_user(user_id, options.include_hidden, offset, limit)
            .await?;
        tx.rollback().await?;
        Ok(orders)
    }

    /// Returns the order's status history, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn history(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Vec<OrderStatusHistoryRecord>> {
        let mut tx = self.store.begin().await?;
        tx.find_order_for_user(user_id, order_id)
            .await?
            .ok_or(FulfillmentError::NotFound("order"))?;
        let rows = tx.status_history(order_id).await?;
        tx.rollback().await?;
        Ok(rows)
    }

    /// Returns the customer-facing tracking timeline.
    #[tracing::instrument(skip(self))]
    pub async fn timeline(&self, user_id: UserId, order_id: OrderId) -> Result<OrderTimeline> {
        let mut tx = self.store.begin().await?;
        let order = tx
            .find_order_for_user(user_id, order_id)
            .await?
            .ok_or(FulfillmentError::NotFound("order"))?;
        let events = tx.tracking_events(order_id).await?;
        tx.rollback().await?;
        Ok(OrderTimeline {
            order_id: order.id,
            order_no: order.order_no,
            payment_status: order.payment_status,
            order_status: order.order_status,
            created_at: order.created_at,
            events,
        })
    }

    /// Cancels an unpaid order and releases its reserved stock.
    ///
    /// Idempotent: a second cancel returns the order unchanged with no
    /// additional stock release, history, or tracking rows.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, user_id: UserId, order_id: OrderId) -> Result<OrderRecord> {
        let mut tx = self.store.begin().await?;
        let order = tx
            .find_order_for_user(user_id, order_id)
            .await?
            .ok_or(FulfillmentError::NotFound("order"))?;

        if order.order_status == OrderStatus::Cancelled {
            tx.rollback().await?;
            return Ok(order);
        }
        if order.payment_status != PaymentStatus::Pending
            || matches!(
                order.order_status,
                OrderStatus::Shipped | OrderStatus::Delivered
            )
        {
            return Err(FulfillmentError::InvalidState(format!(
                "cannot cancel order in {}/{}",
                order.order_status, order.payment_status
            )));
        }

        for item in tx.order_items(order_id).await? {
            tx.release_stock(item.lot_id, item.quantity).await?;
        }

        let order = OrderMutation::of(order)
            .transition_to(
                OrderStatus::Cancelled,
                Some(user_id),
                Some("cancelled by customer".to_string()),
            )
            .with_event(
                TrackingEventType::Cancelled,
                Some("Order cancelled".to_string()),
                serde_json::json!({ "by": "customer" }),
            )
            .apply(tx.as_mut())
            .await?;
        tx.commit().await?;

        metrics::counter!("orders_cancelled_total").increment(1);
        Ok(order)
    }

    /// Refunds a paid order: releases stock, records a REFUNDED payment
    /// row, and closes the order as CANCELLED.
    ///
    /// Idempotent: replays short-circuit on any of the refund markers
    /// already being present.
    #[tracing::instrument(skip(self))]
    pub async fn refund(&self, user_id: UserId, order_id: OrderId) -> Result<OrderRecord> {
        let mut tx = self.store.begin().await?;
        let order = tx
            .find_order_for_user(user_id, order_id)
            .await?
            .ok_or(FulfillmentError::NotFound("order"))?;

        let payments = tx.payments_for_order(order_id).await?;
        let already_refunded = order.payment_status == PaymentStatus::Refunded
            || order.order_status == OrderStatus::Cancelled
            || payments
                .iter()
                .any(|p| p.status == PaymentStatus::Refunded);
        if already_refunded {
            tx.rollback().await?;
            return Ok(order);
        }
        if order.payment_status != PaymentStatus::Paid
            || order.order_status == OrderStatus::Delivered
        {
            return Err(FulfillmentError::InvalidState(format!(
                "cannot refund order in {}/{}",
                order.order_status, order.payment_status
            )));
        }

        for item in tx.order_items(order_id).await? {
            tx.release_stock(item.lot_id, item.quantity).await?;
        }

        let now = Utc::now();
        let source = payments
            .iter()
            .rev()
            .find(|p| p.status == PaymentStatus::Paid);
        tx.insert_payment(&PaymentRecord {
            id: common::PaymentId::new(),
            order_id,
            provider: source
                .map(|p| p.provider.clone())
                .unwrap_or_else(|| "UNKNOWN".to_string()),
            provider_ref: source.and_then(|p| p.provider_ref.clone()),
            amount: order.total,
            status: PaymentStatus::Refunded,
            paid_at: None,
            created_at: now,
        })
        .await?;

        let amount = order.total;
        let mut mutation = OrderMutation::of(order);
        mutation.order_mut().payment_status = PaymentStatus::Refunded;
        let mut mutation = mutation.transition_to(
            OrderStatus::Cancelled,
            Some(user_id),
            Some("refunded".to_string()),
        );
        for (event_type, message) in [
            (TrackingEventType::RefundRequested, "Refund requested"),
            (TrackingEventType::Refunded, "Refund issued"),
            (TrackingEventType::Cancelled, "Order cancelled"),
        ] {
            mutation = mutation.with_event(
                event_type,
                Some(message.to_string()),
                serde_json::json!({ "amount": amount }),
            );
        }
        let order = mutation.apply(tx.as_mut()).await?;
        tx.commit().await?;

        metrics::counter!("orders_refunded_total").increment(1);
        Ok(order)
    }

    /// Applies one edge of the order-status transition table.
    ///
    /// This is the generic override path; cancel and refund are the
    /// specialized versions with stock and payment side effects.
    #[tracing::instrument(skip(self))]
    pub async fn transition(
        &self,
        order_id: OrderId,
        actor: UserId,
        to: OrderStatus,
        note: Option<String>,
    ) -> Result<OrderRecord> {
        let mut tx = self.store.begin().await?;
        let order = tx
            .find_order(order_id)
            .await?
            .ok_or(FulfillmentError::NotFound("order"))?;

        let from = order.order_status;
        if !from.can_transition_to(to) {
            return Err(FulfillmentError::InvalidTransition { from, to });
        }

        let mut mutation =
            OrderMutation::of(order).transition_to(to, Some(actor), note.clone());
        if let Some(event_type) = tracking::order_event_for(to) {
            mutation = mutation.with_event(
                event_type,
                note,
                serde_json::json!({ "from": from, "to": to }),
            );
        }
        let order = mutation.apply(tx.as_mut()).await?;
        tx.commit().await?;

        metrics::counter!("order_transitions_total", "to" => to.as_str()).increment(1);
        Ok(order)
    }

    /// Hides an order from the default list view. Idempotent.
    #[tracing::instrument(skip(self))]
    pub async fn hide_order(&self, user_id: UserId, order_id: OrderId) -> Result<OrderRecord> {
        self.set_hidden(user_id, order_id, true).await
    }

    /// Makes a hidden order visible again. Idempotent.
    #[tracing::instrument(skip(self))]
    pub async fn unhide_order(&self, user_id: UserId, order_id: OrderId) -> Result<OrderRecord> {
        self.set_hidden(user_id, order_id, false).await
    }

    async fn set_hidden(
        &self,
        user_id: UserId,
        order_id: OrderId,
        hidden: bool,
    ) -> Result<OrderRecord> {
        let mut tx = self.store.begin().await?;
        let mut order = tx
            .find_order_for_user(user_id, order_id)
            .await?
            .ok_or(FulfillmentError::NotFound("order"))?;

        if order.hidden_at.is_some() == hidden {
            tx.rollback().await?;
            return Ok(order);
        }
        order.hidden_at = hidden.then(Utc::now);
        order.updated_at = Utc::now();
        tx.update_order(&order).await?;
        tx.commit().await?;
        Ok(order)
    }

    /// Soft-deletes a terminal (DELIVERED or CANCELLED) order. The row
    /// stays until the retention purge removes it; a replay on an already
    /// deleted order returns it unchanged.
    #[tracing::instrument(skip(self))]
    pub async fn soft_delete_order(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<OrderRecord> {
        let mut tx = self.store.begin().await?;
        // Unscoped lookup so a deleted order is visible to the replay
        // check instead of reporting NotFound.
        let mut order = tx
            .find_order(order_id)
            .await?
            .filter(|o| o.user_id == user_id)
            .ok_or(FulfillmentError::NotFound("order"))?;

        if order.deleted_at.is_some() {
            tx.rollback().await?;
            return Ok(order);
        }
        if !order.order_status.is_terminal() {
            return Err(FulfillmentError::InvalidState(format!(
                "cannot delete order in {}",
                order.order_status
            )));
        }
        order.deleted_at = Some(Utc::now());
        order.updated_at = Utc::now();
        tx.update_order(&order).await?;
        tx.commit().await?;
        Ok(order)
    }

    /// Restores a soft-deleted order. Idempotent.
    #[tracing::instrument(skip(self))]
    pub async fn restore_deleted_order(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<OrderRecord> {
        let mut tx = self.store.begin().await?;
        let mut order = tx
            .find_order(order_id)
            .await?
            .filter(|o| o.user_id == user_id)
            .ok_or(FulfillmentError::NotFound("order"))?;

        if order.deleted_at.is_none() {
            tx.rollback().await?;
            return Ok(order);
        }
        order.deleted_at = None;
        order.updated_at = Utc::now();
        tx.update_order(&order).await?;
        tx.commit().await?;
        Ok(order)
    }

    /// Hard-deletes orders soft-deleted longer ago than the retention
    /// window. Returns the number of orders purged.
    #[tracing::instrument(skip(self))]
    pub async fn purge_expired_deleted_orders(&self, retention: Duration) -> Result<u64> {
        let cutoff = Utc::now() - retention;
        let mut tx = self.store.begin().await?;
        let purged = tx.purge_orders_deleted_before(cutoff).await?;
        tx.commit().await?;
        if purged > 0 {
            metrics::counter!("orders_purged_total").increment(purged);
            tracing::info!(purged, "purged expired deleted orders");
        }
        Ok(purged)
    }
}

/// Builds the planned route for a new shipment. GROUND is a single truck
/// hop; AIR is truck to the origin hub, a flight with a placeholder
/// flight number, then truck to the customer.
fn plan_route(
    shipment_id: ShipmentId,
    method: ShippingMethod,
    destination: &str,
) -> Vec<ShipmentLegRecord> {
    let leg = |seq: i32, mode: TransportMode, from: &str, to: &str| ShipmentLegRecord {
        id: LegId::new(),
        shipment_id,
        seq,
        mode,
        status: ShipmentStatus::Planned,
        from_name: from.to_string(),
        to_name: to.to_string(),
        flight_no: None,
        depart_at: None,
        arrive_at: None,
        meta: None,
    };

    match method {
        ShippingMethod::Air => {
            let mut flight = leg(2, TransportMode::Flight, "Origin airport", "Destination airport");
            flight.flight_no = Some("TBD".to_string());
            vec![
                leg(1, TransportMode::Truck, "Seller warehouse", "Origin hub"),
                flight,
                leg(3, TransportMode::Truck, "Destination hub", destination),
            ]
        }
        ShippingMethod::Ground | ShippingMethod::Auto => {
            vec![leg(1, TransportMode::Truck, "Seller warehouse", destination)]
        }
    }
}

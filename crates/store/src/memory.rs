//! In-memory store implementation for testing.
//!
//! Transactions hold the store lock for their whole duration and work on
//! a private copy of the state, so they are fully serialized: commit
//! replaces the shared state atomically, drop discards the copy. This
//! gives the same all-or-nothing and no-lost-update guarantees the
//! PostgreSQL implementation gets from real transactions.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    AddressId, CartId, LotId, LotStatus, OrderId, PaymentId, ShipmentId, ShipmentStatus,
    TrackingEventType, UserId,
};
use tokio::sync::{Mutex, MutexGuard};

use crate::Result;
use crate::records::{
    AddressRecord, CartItemRecord, CartRecord, InventoryLotRecord, OrderItemRecord, OrderRecord,
    OrderStatusHistoryRecord, PaymentRecord, ShipmentLegRecord, ShipmentRecord,
    TrackingEventRecord,
};
use crate::store::{FulfillmentStore, StoreTx};

#[derive(Debug, Clone, Default)]
struct StoreState {
    addresses: Vec<AddressRecord>,
    carts: Vec<CartRecord>,
    cart_items: Vec<CartItemRecord>,
    lots: HashMap<LotId, InventoryLotRecord>,
    orders: HashMap<OrderId, OrderRecord>,
    order_items: Vec<OrderItemRecord>,
    history: Vec<OrderStatusHistoryRecord>,
    payments: Vec<PaymentRecord>,
    shipments: Vec<ShipmentRecord>,
    legs: Vec<ShipmentLegRecord>,
    tracking: Vec<TrackingEventRecord>,
}

/// In-memory store used by unit and integration tests.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    // Seeding helpers for tests. These write directly, outside any
    // transaction, so call them before exercising the domain.

    pub async fn seed_address(&self, address: AddressRecord) {
        self.state.lock().await.addresses.push(address);
    }

    pub async fn seed_lot(&self, lot: InventoryLotRecord) {
        self.state.lock().await.lots.insert(lot.id, lot);
    }

    pub async fn seed_cart(&self, cart: CartRecord, items: Vec<CartItemRecord>) {
        let mut state = self.state.lock().await;
        state.carts.push(cart);
        state.cart_items.extend(items);
    }

    // Inspection helpers for asserts.

    pub async fn lot(&self, lot_id: LotId) -> Option<InventoryLotRecord> {
        self.state.lock().await.lots.get(&lot_id).cloned()
    }

    pub async fn order(&self, order_id: OrderId) -> Option<OrderRecord> {
        self.state.lock().await.orders.get(&order_id).cloned()
    }

    pub async fn tracking_events_of_type(
        &self,
        order_id: OrderId,
        event_type: TrackingEventType,
    ) -> Vec<TrackingEventRecord> {
        self.state
            .lock()
            .await
            .tracking
            .iter()
            .filter(|e| e.order_id == order_id && e.event_type == event_type)
            .cloned()
            .collect()
    }

    pub async fn history_rows(&self, order_id: OrderId) -> Vec<OrderStatusHistoryRecord> {
        self.state
            .lock()
            .await
            .history
            .iter()
            .filter(|h| h.order_id == order_id)
            .cloned()
            .collect()
    }

    pub async fn payments(&self, order_id: OrderId) -> Vec<PaymentRecord> {
        self.state
            .lock()
            .await
            .payments
            .iter()
            .filter(|p| p.order_id == order_id)
            .cloned()
            .collect()
    }
}

struct MemoryTx<'a> {
    guard: MutexGuard<'a, StoreState>,
    work: StoreState,
}

#[async_trait]
impl FulfillmentStore for InMemoryStore {
    async fn begin<'a>(&'a self) -> Result<Box<dyn StoreTx + 'a>> {
        let guard = self.state.lock().await;
        let work = guard.clone();
        Ok(Box::new(MemoryTx { guard, work }))
    }
}

#[async_trait]
impl StoreTx for MemoryTx<'_> {
    async fn find_address(
        &mut self,
        user_id: UserId,
        address_id: AddressId,
    ) -> Result<Option<AddressRecord>> {
        Ok(self
            .work
            .addresses
            .iter()
            .find(|a| a.id == address_id && a.user_id == user_id)
            .cloned())
    }

    async fn find_active_cart(&mut self, user_id: UserId) -> Result<Option<CartRecord>> {
        Ok(self
            .work
            .carts
            .iter()
            .find(|c| c.user_id == user_id && c.status == common::CartStatus::Active)
            .cloned())
    }

    async fn cart_items_with_lots(
        &mut self,
        cart_id: CartId,
    ) -> Result<Vec<(CartItemRecord, InventoryLotRecord)>> {
        Ok(self
            .work
            .cart_items
            .iter()
            .filter(|i| i.cart_id == cart_id)
            .filter_map(|i| {
                self.work
                    .lots
                    .get(&i.lot_id)
                    .map(|lot| (i.clone(), lot.clone()))
            })
            .collect())
    }

    async fn delete_cart_items(&mut self, cart_id: CartId) -> Result<u64> {
        let before = self.work.cart_items.len();
        self.work.cart_items.retain(|i| i.cart_id != cart_id);
        Ok((before - self.work.cart_items.len()) as u64)
    }

    async fn reserve_stock(&mut self, lot_id: LotId, qty: u32) -> Result<bool> {
        match self.work.lots.get_mut(&lot_id) {
            Some(lot)
                if lot.status == LotStatus::Active && lot.quantity_available >= i64::from(qty) =>
            {
                lot.quantity_available -= i64::from(qty);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release_stock(&mut self, lot_id: LotId, qty: u32) -> Result<()> {
        if let Some(lot) = self.work.lots.get_mut(&lot_id) {
            lot.quantity_available += i64::from(qty);
        }
        Ok(())
    }

    async fn insert_order(&mut self, order: &OrderRecord, items: &[OrderItemRecord]) -> Result<()> {
        self.work.orders.insert(order.id, order.clone());
        self.work.order_items.extend_from_slice(items);
        Ok(())
    }

    async fn find_order(&mut self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        Ok(self.work.orders.get(&order_id).cloned())
    }

    async fn find_order_for_user(
        &mut self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<OrderRecord>> {
        Ok(self
            .work
            .orders
            .get(&order_id)
            .filter(|o| o.user_id == user_id && o.deleted_at.is_none())
            .cloned())
    }

    async fn list_orders_for_user(
        &mut self,
        user_id: UserId,
        include_hidden: bool,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<OrderRecord>> {
        let mut orders: Vec<_> = self
            .work
            .orders
            .values()
            .filter(|o| o.user_id == user_id && o.deleted_at.is_none())
            .filter(|o| include_hidden || o.hidden_at.is_none())
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn order_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItemRecord>> {
        Ok(self
            .work
            .order_items
            .iter()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn update_order(&mut self, order: &OrderRecord) -> Result<()> {
        self.work.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn insert_status_history(&mut self, row: &OrderStatusHistoryRecord) -> Result<()> {
        self.work.history.push(row.clone());
        Ok(())
    }

    async fn status_history(&mut self, order_id: OrderId) -> Result<Vec<OrderStatusHistoryRecord>> {
        Ok(self
            .work
            .history
            .iter()
            .filter(|h| h.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn purge_orders_deleted_before(&mut self, cutoff: DateTime<Utc>) -> Result<u64> {
        let doomed: Vec<OrderId> = self
            .work
            .orders
            .values()
            .filter(|o| o.deleted_at.is_some_and(|t| t < cutoff))
            .map(|o| o.id)
            .collect();

        for order_id in &doomed {
            let shipment_ids: Vec<ShipmentId> = self
                .work
                .shipments
                .iter()
                .filter(|s| s.order_id == *order_id)
                .map(|s| s.id)
                .collect();
            self.work
                .legs
                .retain(|l| !shipment_ids.contains(&l.shipment_id));
            self.work.shipments.retain(|s| s.order_id != *order_id);
            self.work.order_items.retain(|i| i.order_id != *order_id);
            self.work.history.retain(|h| h.order_id != *order_id);
            self.work.payments.retain(|p| p.order_id != *order_id);
            self.work.tracking.retain(|e| e.order_id != *order_id);
            self.work.orders.remove(order_id);
        }

        Ok(doomed.len() as u64)
    }

    async fn insert_payment(&mut self, payment: &PaymentRecord) -> Result<()> {
        self.work.payments.push(payment.clone());
        Ok(())
    }

    async fn update_payment(&mut self, payment: &PaymentRecord) -> Result<()> {
        if let Some(existing) = self.work.payments.iter_mut().find(|p| p.id == payment.id) {
            *existing = payment.clone();
        }
        Ok(())
    }

    async fn find_payment(&mut self, payment_id: PaymentId) -> Result<Option<PaymentRecord>> {
        Ok(self
            .work
            .payments
            .iter()
            .find(|p| p.id == payment_id)
            .cloned())
    }

    async fn payments_for_order(&mut self, order_id: OrderId) -> Result<Vec<PaymentRecord>> {
        Ok(self
            .work
            .payments
            .iter()
            .filter(|p| p.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn insert_shipment(
        &mut self,
        shipment: &ShipmentRecord,
        legs: &[ShipmentLegRecord],
    ) -> Result<()> {
        self.work.shipments.push(shipment.clone());
        self.work.legs.extend_from_slice(legs);
        Ok(())
    }

    async fn find_shipment_by_order(
        &mut self,
        order_id: OrderId,
    ) -> Result<Option<ShipmentRecord>> {
        Ok(self
            .work
            .shipments
            .iter()
            .find(|s| s.order_id == order_id)
            .cloned())
    }

    async fn shipment_legs(&mut self, shipment_id: ShipmentId) -> Result<Vec<ShipmentLegRecord>> {
        let mut legs: Vec<_> = self
            .work
            .legs
            .iter()
            .filter(|l| l.shipment_id == shipment_id)
            .cloned()
            .collect();
        legs.sort_by_key(|l| l.seq);
        Ok(legs)
    }

    async fn update_shipment_status(
        &mut self,
        shipment_id: ShipmentId,
        status: ShipmentStatus,
    ) -> Result<()> {
        if let Some(shipment) = self.work.shipments.iter_mut().find(|s| s.id == shipment_id) {
            shipment.status = status;
        }
        Ok(())
    }

    async fn update_leg(&mut self, leg: &ShipmentLegRecord) -> Result<()> {
        if let Some(existing) = self.work.legs.iter_mut().find(|l| l.id == leg.id) {
            *existing = leg.clone();
        }
        Ok(())
    }

    async fn insert_tracking_event(&mut self, event: &TrackingEventRecord) -> Result<()> {
        self.work.tracking.push(event.clone());
        Ok(())
    }

    async fn tracking_events(&mut self, order_id: OrderId) -> Result<Vec<TrackingEventRecord>> {
        Ok(self
            .work
            .tracking
            .iter()
            .filter(|e| e.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn has_tracking_event(
        &mut self,
        order_id: OrderId,
        event_type: TrackingEventType,
    ) -> Result<bool> {
        Ok(self
            .work
            .tracking
            .iter()
            .any(|e| e.order_id == order_id && e.event_type == event_type))
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTx { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        // Dropping the working copy discards all writes.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Money, ProductId, SellerId};

    fn active_lot(quantity: i64) -> InventoryLotRecord {
        InventoryLotRecord {
            id: LotId::new(),
            product_id: ProductId::new(),
            seller_id: SellerId::new(),
            lot_code: "LOT-001".to_string(),
            quantity_available: quantity,
            status: LotStatus::Active,
            expires_at: Utc::now() + chrono::Duration::days(7),
        }
    }

    #[tokio::test]
    async fn reserve_decrements_when_sufficient() {
        let store = InMemoryStore::new();
        let lot = active_lot(5);
        let lot_id = lot.id;
        store.seed_lot(lot).await;

        let mut tx = store.begin().await.unwrap();
        assert!(tx.reserve_stock(lot_id, 3).await.unwrap());
        tx.commit().await.unwrap();

        assert_eq!(store.lot(lot_id).await.unwrap().quantity_available, 2);
    }

    #[tokio::test]
    async fn reserve_fails_when_insufficient() {
        let store = InMemoryStore::new();
        let lot = active_lot(2);
        let lot_id = lot.id;
        store.seed_lot(lot).await;

        let mut tx = store.begin().await.unwrap();
        assert!(!tx.reserve_stock(lot_id, 3).await.unwrap());
        tx.rollback().await.unwrap();

        assert_eq!(store.lot(lot_id).await.unwrap().quantity_available, 2);
    }

    #[tokio::test]
    async fn reserve_fails_on_inactive_lot() {
        let store = InMemoryStore::new();
        let mut lot = active_lot(10);
        lot.status = LotStatus::Expired;
        let lot_id = lot.id;
        store.seed_lot(lot).await;

        let mut tx = store.begin().await.unwrap();
        assert!(!tx.reserve_stock(lot_id, 1).await.unwrap());
    }

    #[tokio::test]
    async fn release_restores_stock() {
        let store = InMemoryStore::new();
        let lot = active_lot(5);
        let lot_id = lot.id;
        store.seed_lot(lot).await;

        let mut tx = store.begin().await.unwrap();
        tx.reserve_stock(lot_id, 5).await.unwrap();
        tx.release_stock(lot_id, 5).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.lot(lot_id).await.unwrap().quantity_available, 5);
    }

    #[tokio::test]
    async fn dropped_transaction_discards_writes() {
        let store = InMemoryStore::new();
        let lot = active_lot(5);
        let lot_id = lot.id;
        store.seed_lot(lot).await;

        {
            let mut tx = store.begin().await.unwrap();
            tx.reserve_stock(lot_id, 5).await.unwrap();
            // No commit.
        }

        assert_eq!(store.lot(lot_id).await.unwrap().quantity_available, 5);
    }

    #[tokio::test]
    async fn purge_removes_order_and_dependents() {
        let store = InMemoryStore::new();
        let order_id = OrderId::new();
        let shipment_id = ShipmentId::new();
        let now = Utc::now();

        let order = OrderRecord {
            id: order_id,
            order_no: "OR260830-TEST01".to_string(),
            user_id: UserId::new(),
            address_id: AddressId::new(),
            shipping_method: common::ShippingMethod::Ground,
            payment_status: common::PaymentStatus::Pending,
            order_status: common::OrderStatus::Cancelled,
            subtotal: Money::from_units(100),
            delivery_fee: Money::from_units(40),
            discount: Money::zero(),
            total: Money::from_units(140),
            hidden_at: None,
            deleted_at: Some(now - chrono::Duration::days(60)),
            created_at: now,
            updated_at: now,
        };

        let mut tx = store.begin().await.unwrap();
        tx.insert_order(&order, &[]).await.unwrap();
        tx.insert_shipment(
            &ShipmentRecord {
                id: shipment_id,
                order_id,
                status: ShipmentStatus::Planned,
            },
            &[],
        )
        .await
        .unwrap();
        tx.insert_tracking_event(&TrackingEventRecord {
            id: common::TrackingEventId::new(),
            order_id,
            event_type: TrackingEventType::OrderCreated,
            message: None,
            meta: serde_json::Value::Null,
            created_at: now,
        })
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let purged = tx
            .purge_orders_deleted_before(now - chrono::Duration::days(30))
            .await
            .unwrap();
        assert_eq!(purged, 1);
        assert!(tx.find_order(order_id).await.unwrap().is_none());
        assert!(
            tx.find_shipment_by_order(order_id)
                .await
                .unwrap()
                .is_none()
        );
        assert!(tx.tracking_events(order_id).await.unwrap().is_empty());
        tx.commit().await.unwrap();
    }
}

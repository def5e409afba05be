use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    AddressId, CartId, LotId, OrderId, PaymentId, ShipmentId, ShipmentStatus, TrackingEventType,
    UserId,
};

use crate::Result;
use crate::records::{
    AddressRecord, CartItemRecord, CartRecord, InventoryLotRecord, OrderItemRecord, OrderRecord,
    OrderStatusHistoryRecord, PaymentRecord, ShipmentLegRecord, ShipmentRecord,
    TrackingEventRecord,
};

/// A store capable of multi-statement atomic transactions.
///
/// All implementations must be thread-safe (Send + Sync). Every domain
/// operation opens one transaction; reads and writes inside it become
/// visible atomically at commit, and dropping the transaction without
/// committing discards every write.
#[async_trait]
pub trait FulfillmentStore: Send + Sync {
    /// Begins a transaction.
    async fn begin<'a>(&'a self) -> Result<Box<dyn StoreTx + 'a>>;
}

/// One open transaction against the store.
///
/// The reservation primitives are the only place stock quantities are
/// mutated, and both are single conditional updates rather than
/// read-then-write, which closes the race window between concurrent
/// checkouts on the same lot.
#[async_trait]
pub trait StoreTx: Send {
    // ---- cart/address boundary (ownership-verified reads) ----

    /// Finds an address owned by the given user.
    async fn find_address(
        &mut self,
        user_id: UserId,
        address_id: AddressId,
    ) -> Result<Option<AddressRecord>>;

    /// Finds the user's ACTIVE cart, if any.
    async fn find_active_cart(&mut self, user_id: UserId) -> Result<Option<CartRecord>>;

    /// Returns the cart's items joined with their inventory lots.
    async fn cart_items_with_lots(
        &mut self,
        cart_id: CartId,
    ) -> Result<Vec<(CartItemRecord, InventoryLotRecord)>>;

    /// Deletes all items from a cart, returning the number removed.
    async fn delete_cart_items(&mut self, cart_id: CartId) -> Result<u64>;

    // ---- inventory ledger ----

    /// Conditionally reserves stock on a lot: decrements
    /// `quantity_available` by `qty` iff the lot is ACTIVE and has at
    /// least `qty` available. Returns false (affecting nothing) otherwise.
    async fn reserve_stock(&mut self, lot_id: LotId, qty: u32) -> Result<bool>;

    /// Unconditionally returns stock to a lot.
    async fn release_stock(&mut self, lot_id: LotId, qty: u32) -> Result<()>;

    // ---- orders ----

    /// Inserts an order together with its item snapshots.
    async fn insert_order(&mut self, order: &OrderRecord, items: &[OrderItemRecord]) -> Result<()>;

    /// Finds an order by id regardless of owner (webhook path).
    async fn find_order(&mut self, order_id: OrderId) -> Result<Option<OrderRecord>>;

    /// Finds an order owned by the given user. Soft-deleted orders are
    /// not returned.
    async fn find_order_for_user(
        &mut self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<OrderRecord>>;

    /// Lists a user's orders, newest first. Soft-deleted orders are
    /// always excluded; hidden orders only when `include_hidden` is false.
    async fn list_orders_for_user(
        &mut self,
        user_id: UserId,
        include_hidden: bool,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<OrderRecord>>;

    /// Returns the order's item snapshots.
    async fn order_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItemRecord>>;

    /// Writes back a mutated order header.
    async fn update_order(&mut self, order: &OrderRecord) -> Result<()>;

    /// Appends one status-history row.
    async fn insert_status_history(&mut self, row: &OrderStatusHistoryRecord) -> Result<()>;

    /// Returns the status history, oldest first.
    async fn status_history(&mut self, order_id: OrderId) -> Result<Vec<OrderStatusHistoryRecord>>;

    /// Hard-deletes orders (and their dependent rows) whose `deleted_at`
    /// is before the cutoff. Returns the number of orders removed.
    async fn purge_orders_deleted_before(&mut self, cutoff: DateTime<Utc>) -> Result<u64>;

    // ---- payments ----

    async fn insert_payment(&mut self, payment: &PaymentRecord) -> Result<()>;

    async fn update_payment(&mut self, payment: &PaymentRecord) -> Result<()>;

    async fn find_payment(&mut self, payment_id: PaymentId) -> Result<Option<PaymentRecord>>;

    /// Returns all payment rows for an order, oldest first.
    async fn payments_for_order(&mut self, order_id: OrderId) -> Result<Vec<PaymentRecord>>;

    // ---- shipments ----

    /// Inserts a shipment together with its legs.
    async fn insert_shipment(
        &mut self,
        shipment: &ShipmentRecord,
        legs: &[ShipmentLegRecord],
    ) -> Result<()>;

    async fn find_shipment_by_order(&mut self, order_id: OrderId)
    -> Result<Option<ShipmentRecord>>;

    /// Returns the shipment's legs ordered by `seq` ascending.
    async fn shipment_legs(&mut self, shipment_id: ShipmentId) -> Result<Vec<ShipmentLegRecord>>;

    async fn update_shipment_status(
        &mut self,
        shipment_id: ShipmentId,
        status: ShipmentStatus,
    ) -> Result<()>;

    async fn update_leg(&mut self, leg: &ShipmentLegRecord) -> Result<()>;

    // ---- tracking ledger ----

    /// Appends a tracking event. The ledger is append-only; there is no
    /// update or delete.
    async fn insert_tracking_event(&mut self, event: &TrackingEventRecord) -> Result<()>;

    /// Returns the order's tracking events, oldest first.
    async fn tracking_events(&mut self, order_id: OrderId) -> Result<Vec<TrackingEventRecord>>;

    /// Returns true if an event of the given type already exists for the
    /// order. Used for the at-most-one-DELIVERED guard.
    async fn has_tracking_event(
        &mut self,
        order_id: OrderId,
        event_type: TrackingEventType,
    ) -> Result<bool>;

    // ---- transaction control ----

    /// Commits the transaction, making all writes visible atomically.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rolls the transaction back explicitly. Dropping without commit
    /// has the same effect.
    async fn rollback(self: Box<Self>) -> Result<()>;
}

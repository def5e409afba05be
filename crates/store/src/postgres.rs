//! PostgreSQL-backed store implementation.
//!
//! Stock reservation is a single conditional `UPDATE … WHERE` checked
//! via the affected-row count, never a read followed by a write, so it
//! is safe at any isolation level that gives atomic single-row updates.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    AddressId, CartId, CartItemId, LegId, LotId, OrderId, OrderItemId, PaymentId, ProductId,
    SellerId, ShipmentId, ShipmentStatus, TrackingEventId, TrackingEventType, UserId,
};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::Result;
use crate::records::{
    AddressRecord, CartItemRecord, CartRecord, InventoryLotRecord, OrderItemRecord, OrderRecord,
    OrderStatusHistoryRecord, PaymentRecord, ShipmentLegRecord, ShipmentRecord,
    TrackingEventRecord,
};
use crate::store::{FulfillmentStore, StoreTx};

/// PostgreSQL store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store on an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        tracing::info!("running database migrations");
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }
}

struct PgTx {
    tx: Transaction<'static, Postgres>,
}

const ORDER_COLUMNS: &str = "id, order_no, user_id, address_id, shipping_method, payment_status, \
     order_status, subtotal_cents, delivery_fee_cents, discount_cents, total_cents, \
     hidden_at, deleted_at, created_at, updated_at";

const PAYMENT_COLUMNS: &str =
    "id, order_id, provider, provider_ref, amount_cents, status, paid_at, created_at";

const LEG_COLUMNS: &str = "id, shipment_id, seq, mode, status, from_name, to_name, flight_no, \
     depart_at, arrive_at, meta";

fn row_to_order(row: PgRow) -> Result<OrderRecord> {
    Ok(OrderRecord {
        id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
        order_no: row.try_get("order_no")?,
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        address_id: AddressId::from_uuid(row.try_get::<Uuid, _>("address_id")?),
        shipping_method: row.try_get::<String, _>("shipping_method")?.parse()?,
        payment_status: row.try_get::<String, _>("payment_status")?.parse()?,
        order_status: row.try_get::<String, _>("order_status")?.parse()?,
        subtotal: common::Money::from_cents(row.try_get("subtotal_cents")?),
        delivery_fee: common::Money::from_cents(row.try_get("delivery_fee_cents")?),
        discount: common::Money::from_cents(row.try_get("discount_cents")?),
        total: common::Money::from_cents(row.try_get("total_cents")?),
        hidden_at: row.try_get("hidden_at")?,
        deleted_at: row.try_get("deleted_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_order_item(row: PgRow) -> Result<OrderItemRecord> {
    Ok(OrderItemRecord {
        id: OrderItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
        order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
        product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
        lot_id: LotId::from_uuid(row.try_get::<Uuid, _>("lot_id")?),
        seller_id: SellerId::from_uuid(row.try_get::<Uuid, _>("seller_id")?),
        quantity: row.try_get::<i32, _>("quantity")? as u32,
        unit_price: common::Money::from_cents(row.try_get("unit_price_cents")?),
        line_total: common::Money::from_cents(row.try_get("line_total_cents")?),
    })
}

fn row_to_payment(row: PgRow) -> Result<PaymentRecord> {
    Ok(PaymentRecord {
        id: PaymentId::from_uuid(row.try_get::<Uuid, _>("id")?),
        order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
        provider: row.try_get("provider")?,
        provider_ref: row.try_get("provider_ref")?,
        amount: common::Money::from_cents(row.try_get("amount_cents")?),
        status: row.try_get::<String, _>("status")?.parse()?,
        paid_at: row.try_get("paid_at")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_leg(row: PgRow) -> Result<ShipmentLegRecord> {
    Ok(ShipmentLegRecord {
        id: LegId::from_uuid(row.try_get::<Uuid, _>("id")?),
        shipment_id: ShipmentId::from_uuid(row.try_get::<Uuid, _>("shipment_id")?),
        seq: row.try_get("seq")?,
        mode: row.try_get::<String, _>("mode")?.parse()?,
        status: row.try_get::<String, _>("status")?.parse()?,
        from_name: row.try_get("from_name")?,
        to_name: row.try_get("to_name")?,
        flight_no: row.try_get("flight_no")?,
        depart_at: row.try_get("depart_at")?,
        arrive_at: row.try_get("arrive_at")?,
        meta: row.try_get("meta")?,
    })
}

fn row_to_tracking_event(row: PgRow) -> Result<TrackingEventRecord> {
    Ok(TrackingEventRecord {
        id: TrackingEventId::from_uuid(row.try_get::<Uuid, _>("id")?),
        order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
        event_type: row.try_get::<String, _>("event_type")?.parse()?,
        message: row.try_get("message")?,
        meta: row.try_get("meta")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl FulfillmentStore for PostgresStore {
    async fn begin<'a>(&'a self) -> Result<Box<dyn StoreTx + 'a>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn find_address(
        &mut self,
        user_id: UserId,
        address_id: AddressId,
    ) -> Result<Option<AddressRecord>> {
        let row = sqlx::query("SELECT id, user_id, label FROM addresses WHERE id = $1 AND user_id = $2")
            .bind(address_id.as_uuid())
            .bind(user_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;

        match row {
            Some(row) => Ok(Some(AddressRecord {
                id: AddressId::from_uuid(row.try_get::<Uuid, _>("id")?),
                user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
                label: row.try_get("label")?,
            })),
            None => Ok(None),
        }
    }

    async fn find_active_cart(&mut self, user_id: UserId) -> Result<Option<CartRecord>> {
        let row =
            sqlx::query("SELECT id, user_id, status FROM carts WHERE user_id = $1 AND status = 'ACTIVE'")
                .bind(user_id.as_uuid())
                .fetch_optional(&mut *self.tx)
                .await?;

        match row {
            Some(row) => Ok(Some(CartRecord {
                id: CartId::from_uuid(row.try_get::<Uuid, _>("id")?),
                user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
                status: row.try_get::<String, _>("status")?.parse()?,
            })),
            None => Ok(None),
        }
    }

    async fn cart_items_with_lots(
        &mut self,
        cart_id: CartId,
    ) -> Result<Vec<(CartItemRecord, InventoryLotRecord)>> {
        let rows = sqlx::query(
            r#"
            SELECT ci.id AS item_id, ci.cart_id, ci.product_id AS item_product_id,
                   ci.lot_id, ci.quantity, ci.unit_price_cents,
                   l.id AS lot_pk, l.product_id AS lot_product_id, l.seller_id,
                   l.lot_code, l.quantity_available, l.status AS lot_status, l.expires_at
            FROM cart_items ci
            JOIN inventory_lots l ON l.id = ci.lot_id
            WHERE ci.cart_id = $1
            "#,
        )
        .bind(cart_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter()
            .map(|row| {
                let item = CartItemRecord {
                    id: CartItemId::from_uuid(row.try_get::<Uuid, _>("item_id")?),
                    cart_id: CartId::from_uuid(row.try_get::<Uuid, _>("cart_id")?),
                    product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("item_product_id")?),
                    lot_id: LotId::from_uuid(row.try_get::<Uuid, _>("lot_id")?),
                    quantity: row.try_get::<i32, _>("quantity")? as u32,
                    unit_price: common::Money::from_cents(row.try_get("unit_price_cents")?),
                };
                let lot = InventoryLotRecord {
                    id: LotId::from_uuid(row.try_get::<Uuid, _>("lot_pk")?),
                    product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("lot_product_id")?),
                    seller_id: SellerId::from_uuid(row.try_get::<Uuid, _>("seller_id")?),
                    lot_code: row.try_get("lot_code")?,
                    quantity_available: row.try_get("quantity_available")?,
                    status: row.try_get::<String, _>("lot_status")?.parse()?,
                    expires_at: row.try_get("expires_at")?,
                };
                Ok((item, lot))
            })
            .collect()
    }

    async fn delete_cart_items(&mut self, cart_id: CartId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id.as_uuid())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self))]
    async fn reserve_stock(&mut self, lot_id: LotId, qty: u32) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE inventory_lots
            SET quantity_available = quantity_available - $2
            WHERE id = $1 AND status = 'ACTIVE' AND quantity_available >= $2
            "#,
        )
        .bind(lot_id.as_uuid())
        .bind(i64::from(qty))
        .execute(&mut *self.tx)
        .await?;

        let reserved = result.rows_affected() == 1;
        if !reserved {
            tracing::debug!(%lot_id, qty, "stock reservation rejected");
        }
        Ok(reserved)
    }

    async fn release_stock(&mut self, lot_id: LotId, qty: u32) -> Result<()> {
        sqlx::query(
            "UPDATE inventory_lots SET quantity_available = quantity_available + $2 WHERE id = $1",
        )
        .bind(lot_id.as_uuid())
        .bind(i64::from(qty))
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_order(&mut self, order: &OrderRecord, items: &[OrderItemRecord]) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, order_no, user_id, address_id, shipping_method,
                payment_status, order_status, subtotal_cents, delivery_fee_cents,
                discount_cents, total_cents, hidden_at, deleted_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(&order.order_no)
        .bind(order.user_id.as_uuid())
        .bind(order.address_id.as_uuid())
        .bind(order.shipping_method.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.order_status.as_str())
        .bind(order.subtotal.cents())
        .bind(order.delivery_fee.cents())
        .bind(order.discount.cents())
        .bind(order.total.cents())
        .bind(order.hidden_at)
        .bind(order.deleted_at)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, product_id, lot_id, seller_id,
                    quantity, unit_price_cents, line_total_cents)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(item.id.as_uuid())
            .bind(item.order_id.as_uuid())
            .bind(item.product_id.as_uuid())
            .bind(item.lot_id.as_uuid())
            .bind(item.seller_id.as_uuid())
            .bind(item.quantity as i32)
            .bind(item.unit_price.cents())
            .bind(item.line_total.cents())
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn find_order(&mut self, order_id: OrderId) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(order_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(row_to_order).transpose()
    }

    async fn find_order_for_user(
        &mut self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL"
        ))
        .bind(order_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(row_to_order).transpose()
    }

    async fn list_orders_for_user(
        &mut self,
        user_id: UserId,
        include_hidden: bool,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<OrderRecord>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE user_id = $1 AND deleted_at IS NULL AND ($2 OR hidden_at IS NULL)
            ORDER BY created_at DESC
            OFFSET $3 LIMIT $4
            "#
        ))
        .bind(user_id.as_uuid())
        .bind(include_hidden)
        .bind(i64::from(offset))
        .bind(i64::from(limit))
        .fetch_all(&mut *self.tx)
        .await?;
        rows.into_iter().map(row_to_order).collect()
    }

    async fn order_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItemRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, product_id, lot_id, seller_id, quantity,
                   unit_price_cents, line_total_cents
            FROM order_items WHERE order_id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;
        rows.into_iter().map(row_to_order_item).collect()
    }

    async fn update_order(&mut self, order: &OrderRecord) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE orders
            SET payment_status = $2, order_status = $3, hidden_at = $4,
                deleted_at = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.payment_status.as_str())
        .bind(order.order_status.as_str())
        .bind(order.hidden_at)
        .bind(order.deleted_at)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_status_history(&mut self, row: &OrderStatusHistoryRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO order_status_history (order_id, from_status, to_status,
                changed_by, note, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(row.order_id.as_uuid())
        .bind(row.from_status.as_str())
        .bind(row.to_status.as_str())
        .bind(row.changed_by.map(|u| u.as_uuid()))
        .bind(&row.note)
        .bind(row.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn status_history(&mut self, order_id: OrderId) -> Result<Vec<OrderStatusHistoryRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, from_status, to_status, changed_by, note, created_at
            FROM order_status_history
            WHERE order_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(OrderStatusHistoryRecord {
                    order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
                    from_status: row.try_get::<String, _>("from_status")?.parse()?,
                    to_status: row.try_get::<String, _>("to_status")?.parse()?,
                    changed_by: row
                        .try_get::<Option<Uuid>, _>("changed_by")?
                        .map(UserId::from_uuid),
                    note: row.try_get("note")?,
                    created_at: row.try_get("created_at")?,
                })
            })
            .collect()
    }

    #[tracing::instrument(skip(self))]
    async fn purge_orders_deleted_before(&mut self, cutoff: DateTime<Utc>) -> Result<u64> {
        // Dependent rows go via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM orders WHERE deleted_at IS NOT NULL AND deleted_at < $1")
            .bind(cutoff)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_payment(&mut self, payment: &PaymentRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (id, order_id, provider, provider_ref, amount_cents,
                status, paid_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.order_id.as_uuid())
        .bind(&payment.provider)
        .bind(&payment.provider_ref)
        .bind(payment.amount.cents())
        .bind(payment.status.as_str())
        .bind(payment.paid_at)
        .bind(payment.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_payment(&mut self, payment: &PaymentRecord) -> Result<()> {
        sqlx::query("UPDATE payments SET status = $2, paid_at = $3, provider_ref = $4 WHERE id = $1")
            .bind(payment.id.as_uuid())
            .bind(payment.status.as_str())
            .bind(payment.paid_at)
            .bind(&payment.provider_ref)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn find_payment(&mut self, payment_id: PaymentId) -> Result<Option<PaymentRecord>> {
        let row = sqlx::query(&format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1"))
            .bind(payment_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(row_to_payment).transpose()
    }

    async fn payments_for_order(&mut self, order_id: OrderId) -> Result<Vec<PaymentRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = $1 ORDER BY created_at ASC"
        ))
        .bind(order_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;
        rows.into_iter().map(row_to_payment).collect()
    }

    async fn insert_shipment(
        &mut self,
        shipment: &ShipmentRecord,
        legs: &[ShipmentLegRecord],
    ) -> Result<()> {
        sqlx::query("INSERT INTO shipments (id, order_id, status) VALUES ($1, $2, $3)")
            .bind(shipment.id.as_uuid())
            .bind(shipment.order_id.as_uuid())
            .bind(shipment.status.as_str())
            .execute(&mut *self.tx)
            .await?;

        for leg in legs {
            sqlx::query(
                r#"
                INSERT INTO shipment_legs (id, shipment_id, seq, mode, status,
                    from_name, to_name, flight_no, depart_at, arrive_at, meta)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(leg.id.as_uuid())
            .bind(leg.shipment_id.as_uuid())
            .bind(leg.seq)
            .bind(leg.mode.as_str())
            .bind(leg.status.as_str())
            .bind(&leg.from_name)
            .bind(&leg.to_name)
            .bind(&leg.flight_no)
            .bind(leg.depart_at)
            .bind(leg.arrive_at)
            .bind(&leg.meta)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn find_shipment_by_order(
        &mut self,
        order_id: OrderId,
    ) -> Result<Option<ShipmentRecord>> {
        let row = sqlx::query("SELECT id, order_id, status FROM shipments WHERE order_id = $1")
            .bind(order_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;

        match row {
            Some(row) => Ok(Some(ShipmentRecord {
                id: ShipmentId::from_uuid(row.try_get::<Uuid, _>("id")?),
                order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
                status: row.try_get::<String, _>("status")?.parse()?,
            })),
            None => Ok(None),
        }
    }

    async fn shipment_legs(&mut self, shipment_id: ShipmentId) -> Result<Vec<ShipmentLegRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {LEG_COLUMNS} FROM shipment_legs WHERE shipment_id = $1 ORDER BY seq ASC"
        ))
        .bind(shipment_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;
        rows.into_iter().map(row_to_leg).collect()
    }

    async fn update_shipment_status(
        &mut self,
        shipment_id: ShipmentId,
        status: ShipmentStatus,
    ) -> Result<()> {
        sqlx::query("UPDATE shipments SET status = $2 WHERE id = $1")
            .bind(shipment_id.as_uuid())
            .bind(status.as_str())
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn update_leg(&mut self, leg: &ShipmentLegRecord) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE shipment_legs
            SET status = $2, flight_no = $3, depart_at = $4, arrive_at = $5, meta = $6
            WHERE id = $1
            "#,
        )
        .bind(leg.id.as_uuid())
        .bind(leg.status.as_str())
        .bind(&leg.flight_no)
        .bind(leg.depart_at)
        .bind(leg.arrive_at)
        .bind(&leg.meta)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_tracking_event(&mut self, event: &TrackingEventRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tracking_events (id, order_id, event_type, message, meta, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(event.id.as_uuid())
        .bind(event.order_id.as_uuid())
        .bind(event.event_type.as_str())
        .bind(&event.message)
        .bind(&event.meta)
        .bind(event.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn tracking_events(&mut self, order_id: OrderId) -> Result<Vec<TrackingEventRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, event_type, message, meta, created_at
            FROM tracking_events
            WHERE order_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;
        rows.into_iter().map(row_to_tracking_event).collect()
    }

    async fn has_tracking_event(
        &mut self,
        order_id: OrderId,
        event_type: TrackingEventType,
    ) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM tracking_events WHERE order_id = $1 AND event_type = $2)",
        )
        .bind(order_id.as_uuid())
        .bind(event_type.as_str())
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(exists)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

//! Transactional store boundary for the fulfillment backend.
//!
//! The domain layer never touches rows directly. Every multi-step
//! mutation runs through a [`StoreTx`], which is all-or-nothing: either
//! `commit` makes every write visible at once, or the transaction is
//! dropped and nothing happened. Stock reservation is a conditional
//! single-row update so concurrent checkouts can never oversell.
//!
//! Two implementations are provided: [`InMemoryStore`] for tests and
//! [`PostgresStore`] backed by `sqlx`.

pub mod config;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod records;
pub mod store;

pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use records::{
    AddressRecord, CartItemRecord, CartRecord, InventoryLotRecord, OrderItemRecord, OrderRecord,
    OrderStatusHistoryRecord, PaymentRecord, ShipmentLegRecord, ShipmentRecord,
    TrackingEventRecord,
};
pub use store::{FulfillmentStore, StoreTx};

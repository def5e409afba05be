//! Domain error taxonomy.
//!
//! Each variant maps to a stable caller-visible kind so retries can be
//! driven safely. Idempotent replays (cancel/refund/webhook/leg replays)
//! are not errors; they return success with the prior state.

use common::OrderStatus;
use store::StoreError;
use thiserror::Error;

/// Errors surfaced by the lifecycle engine, shipment aggregator, and
/// payment reconciler.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// Entity absent, or present but not owned by the caller.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Malformed input: bad quantities, flight-field misuse, unknown
    /// webhook events, arrive-before-depart windows.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The operation is not legal for the entity's current state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The requested order-status edge is not in the transition table.
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Conditional stock reservation failed for a lot.
    #[error("Out of stock: lot {lot_code}")]
    OutOfStock { lot_code: String },

    /// An error occurred in the store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, FulfillmentError>;

//! Core services of the fulfillment backend.
//!
//! This crate provides the transactional order lifecycle:
//! - [`order::OrderEngine`]: checkout, cancel, refund, manual status
//!   transition, visibility flags, and the deleted-order purge
//! - [`shipment::ShipmentService`]: leg transitions aggregated into the
//!   overall shipment status, synchronized onto the order
//! - [`payment::PaymentService`]: payment intents and provider webhooks
//!
//! Every operation runs in one store transaction; the append-only history
//! and tracking ledgers are written inside the same transaction as the
//! mutation that caused them.

mod audit;
pub mod error;
pub mod order;
pub mod payment;
pub mod shipment;
pub mod tracking;

pub use error::{FulfillmentError, Result};
pub use order::{
    FlatRateCard, ListOptions, OrderDetails, OrderEngine, OrderTimeline, RateCard, ShippingPolicy,
};
pub use payment::{PaymentIntent, PaymentService, WebhookEvent, WebhookOutcome};
pub use shipment::{Actor, LegTransition, LegTransitionOutcome, ShipmentDetails, ShipmentService};

//! Shared types for the fulfillment backend.
//!
//! This crate provides the vocabulary used across the store and domain
//! layers: typed UUID identifiers, exact-arithmetic money, and the status
//! enums together with their pure lookup tables (order-status transition
//! edges, shipment-status ranking).

pub mod ids;
pub mod money;
pub mod status;

pub use ids::{
    AddressId, CartId, CartItemId, LegId, LotId, OrderId, OrderItemId, PaymentId, ProductId,
    SellerId, ShipmentId, TrackingEventId, UserId,
};
pub use money::Money;
pub use status::{
    CartStatus, LotStatus, OrderStatus, PaymentStatus, ShipmentStatus, ShippingMethod,
    TrackingEventType, TransportMode,
};

//! Order lifecycle: checkout, status transitions, cancellation, refund,
//! visibility flags, and retention purge.

mod engine;
mod number;
mod pricing;

pub use engine::{ListOptions, OrderDetails, OrderEngine, OrderTimeline};
pub use number::generate_order_no;
pub use pricing::{FlatRateCard, RateCard, ShippingPolicy};

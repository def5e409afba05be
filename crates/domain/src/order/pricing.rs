//! Delivery-fee pricing and shipping-method resolution.

use common::{Money, ShippingMethod};

/// Resolves the delivery fee for a concrete shipping method.
///
/// The surcharge only applies to AIR; callers pass whatever the customer
/// requested and the card decides whether it counts.
pub trait RateCard: Send + Sync {
    fn delivery_fee(&self, method: ShippingMethod, surcharge: Money) -> Money;
}

/// Flat-rate card: GROUND is a fixed fee, AIR is a higher fixed fee plus
/// the customer's surcharge clamped to be non-negative.
#[derive(Debug, Clone)]
pub struct FlatRateCard {
    pub ground_fee: Money,
    pub air_base_fee: Money,
}

impl Default for FlatRateCard {
    fn default() -> Self {
        Self {
            ground_fee: Money::from_units(40),
            air_base_fee: Money::from_units(240),
        }
    }
}

impl RateCard for FlatRateCard {
    fn delivery_fee(&self, method: ShippingMethod, surcharge: Money) -> Money {
        match method {
            ShippingMethod::Ground => self.ground_fee,
            ShippingMethod::Air => self.air_base_fee + surcharge.clamp_non_negative(),
            // AUTO is resolved before pricing; see ShippingPolicy.
            ShippingMethod::Auto => self.ground_fee,
        }
    }
}

/// Resolves AUTO to a concrete method. Routing signals (weight, distance,
/// perishability windows) would feed in here; for now the policy is a
/// fixed default.
#[derive(Debug, Clone)]
pub struct ShippingPolicy {
    pub auto_resolves_to: ShippingMethod,
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self {
            auto_resolves_to: ShippingMethod::Ground,
        }
    }
}

impl ShippingPolicy {
    /// Returns the concrete method for the customer's request. Never
    /// returns AUTO.
    pub fn resolve(&self, requested: ShippingMethod) -> ShippingMethod {
        match requested {
            ShippingMethod::Auto => self.auto_resolves_to,
            other => other,
        }
    }
}

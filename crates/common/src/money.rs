//! Money represented in integer cents to keep all order arithmetic exact.

use serde::{Deserialize, Serialize};

/// A monetary amount in cents.
///
/// Line totals, fees, and order totals are all computed in cents so that
/// `sum(line_total) == subtotal` holds exactly, with no floating-point
/// rounding anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money {
    cents: i64,
}

impl Money {
    /// Creates an amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Creates an amount from whole currency units.
    pub fn from_units(units: i64) -> Self {
        Self { cents: units * 100 }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Multiplies by a quantity.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money {
            cents: self.cents * i64::from(quantity),
        }
    }

    /// Clamps negative amounts to zero. Used for surcharges that must not
    /// reduce a fee.
    pub fn clamp_non_negative(&self) -> Money {
        Money {
            cents: self.cents.max(0),
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let units = self.cents / 100;
        let part = self.cents.abs() % 100;
        if self.cents < 0 {
            write!(f, "-{}.{:02}", units.abs(), part)
        } else {
            write!(f, "{units}.{part:02}")
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents + rhs.cents,
        }
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents - rhs.cents,
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.cents += rhs.cents;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_units() {
        let money = Money::from_units(40);
        assert_eq!(money.cents(), 4000);
    }

    #[test]
    fn arithmetic_is_exact() {
        let unit_price = Money::from_units(100);
        let line = unit_price.multiply(3);
        assert_eq!(line.cents(), 30000);
        assert_eq!((line + Money::from_units(260)).cents(), 56000);
        assert_eq!((line - Money::from_units(100)).cents(), 20000);
    }

    #[test]
    fn clamp_non_negative() {
        assert_eq!(Money::from_cents(-500).clamp_non_negative(), Money::zero());
        assert_eq!(
            Money::from_cents(500).clamp_non_negative(),
            Money::from_cents(500)
        );
    }

    #[test]
    fn sum_over_iterator() {
        let total: Money = [Money::from_units(1), Money::from_units(2)]
            .into_iter()
            .sum();
        assert_eq!(total, Money::from_units(3));
    }

    #[test]
    fn display() {
        assert_eq!(Money::from_cents(1234).to_string(), "12.34");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-1234).to_string(), "-12.34");
    }

    #[test]
    fn serializes_as_bare_cents() {
        let json = serde_json::to_string(&Money::from_cents(560)).unwrap();
        assert_eq!(json, "560");
    }
}

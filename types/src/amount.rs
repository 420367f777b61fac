//! Currency amounts.
//!
//! Amounts are represented as fixed-point integers (u128) to avoid floating-point errors.
//! The smallest unit is 1 hasting.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};

/// An amount of coins, stored as raw units.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Currency(u128);

impl Currency {
    pub const ZERO: Self = Self(0);

    pub fn new(raw: u128) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl Add for Currency {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Currency {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

/// Saturates instead of overflowing, so summing untrusted outputs never panics.
impl Sum for Currency {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::saturating_add)
    }
}

impl<'a> Sum<&'a Currency> for Currency {
    fn sum<I: Iterator<Item = &'a Currency>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} H", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_saturates() {
        let total: Currency = [Currency::new(u128::MAX), Currency::new(1)].into_iter().sum();
        assert_eq!(total, Currency::new(u128::MAX));
    }

    #[test]
    fn sum_of_refs() {
        let values = vec![Currency::new(3), Currency::new(4)];
        let total: Currency = values.iter().sum();
        assert_eq!(total.raw(), 7);
    }

    #[test]
    fn checked_sub_underflow() {
        assert_eq!(Currency::new(1).checked_sub(Currency::new(2)), None);
        assert_eq!(Currency::new(1).saturating_sub(Currency::new(2)), Currency::ZERO);
    }
}

//! Wallet age: net chain height progress seen by the wallet.

use std::fmt;

/// Incremented by every applied block and decremented by every reverted
/// block. Maturity checks outside the wallet compare it against the age
/// recorded on each output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AgeCounter(i64);

impl AgeCounter {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Subtract `reverted` and add `applied`, returning the net change.
    pub fn adjust(&mut self, reverted: usize, applied: usize) -> i64 {
        let before = self.0;
        self.0 = self
            .0
            .saturating_sub(to_i64(reverted))
            .saturating_add(to_i64(applied));
        self.0 - before
    }
}

fn to_i64(count: usize) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

impl fmt::Display for AgeCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

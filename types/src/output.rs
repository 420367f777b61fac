//! Coin outputs.

use serde::{Deserialize, Serialize};

use crate::{Currency, UnlockHash};

/// A discrete, spendable unit of currency addressed to one spend condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoinOutput {
    pub value: Currency,
    pub unlock_hash: UnlockHash,
}

impl CoinOutput {
    pub fn new(value: Currency, unlock_hash: UnlockHash) -> Self {
        Self { value, unlock_hash }
    }
}

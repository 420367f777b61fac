//! Wallet persistence trait and the records it stores.

use cirrus_types::{CoinOutput, CoinOutputDiff, OutputId, UnlockHash};
use serde::{Deserialize, Serialize};

use crate::StoreError;

/// One output the wallet has ever observed for a key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub id: OutputId,
    pub output: CoinOutput,
    pub spendable: bool,
    pub age: i64,
}

/// A key the wallet controls and every output seen for it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    pub unlock_hash: UnlockHash,
    pub outputs: Vec<OutputRecord>,
}

/// Complete persisted wallet state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletRecord {
    /// Net chain height progress observed by the wallet.
    pub age: i64,
    pub keys: Vec<KeyRecord>,
    /// The unconfirmed diffs currently overlaid on the confirmed state.
    pub unconfirmed_diffs: Vec<CoinOutputDiff>,
}

impl WalletRecord {
    /// Total number of outputs across all keys.
    pub fn output_count(&self) -> usize {
        self.keys.iter().map(|k| k.outputs.len()).sum()
    }
}

/// Trait for wallet storage operations.
pub trait WalletStore: Send + Sync {
    /// Load the saved wallet, or `None` if nothing has been saved yet.
    fn load_wallet(&self) -> Result<Option<WalletRecord>, StoreError>;

    /// Replace the saved wallet atomically.
    fn save_wallet(&self, record: &WalletRecord) -> Result<(), StoreError>;
}

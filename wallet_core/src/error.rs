use cirrus_types::{OutputId, UnlockHash};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    /// A diff tried to remove an output the wallet never observed. The
    /// consensus or pool collaborator delivered diffs out of order, or the
    /// ledger is corrupt.
    #[error("cannot revert unknown output {id} for address {address}")]
    UnknownOutput { address: UnlockHash, id: OutputId },

    #[error("store error: {0}")]
    Store(#[from] cirrus_store::StoreError),

    #[error("config error: {0}")]
    Config(String),
}

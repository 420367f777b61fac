//! Spend-condition addresses.

use crate::hash::hash_type;

hash_type! {
    /// Hash of the conditions required to spend an output.
    ///
    /// Wallets register the unlock hashes they control; every coin output is
    /// addressed to exactly one unlock hash.
    UnlockHash
}

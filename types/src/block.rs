//! Block identifiers.

use crate::hash::hash_type;

hash_type! {
    /// A 32-byte block id. Consensus changes list the ids of blocks that were
    /// reverted from and applied to the canonical chain.
    BlockId
}

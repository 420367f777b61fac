//! Consensus change notifications.

use serde::{Deserialize, Serialize};

use crate::{BlockId, CoinOutputDiff};

/// Everything that changed on the canonical chain since the previous
/// notification.
///
/// During a reorganization `reverted_blocks` lists the blocks removed from
/// the old tip and `coin_output_diffs` already contains the inverses of their
/// diffs, followed by the diffs of the newly applied blocks, in order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusChange {
    #[serde(default)]
    pub reverted_blocks: Vec<BlockId>,
    #[serde(default)]
    pub applied_blocks: Vec<BlockId>,
    #[serde(default)]
    pub coin_output_diffs: Vec<CoinOutputDiff>,
}

impl ConsensusChange {
    pub fn reverted_block_count(&self) -> usize {
        self.reverted_blocks.len()
    }

    pub fn applied_block_count(&self) -> usize {
        self.applied_blocks.len()
    }

    /// True if the change carries neither blocks nor diffs.
    pub fn is_empty(&self) -> bool {
        self.reverted_blocks.is_empty()
            && self.applied_blocks.is_empty()
            && self.coin_output_diffs.is_empty()
    }
}

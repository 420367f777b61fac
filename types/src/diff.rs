//! Output diffs: the unit of change reported by consensus and the
//! transaction pool.

use serde::{Deserialize, Serialize};

use crate::{CoinOutput, OutputId, UnlockHash};

/// Which way a diff moves an output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffDirection {
    /// The output is created and becomes available.
    Apply,
    /// The output is removed (spent, or its creation was undone).
    Revert,
}

impl DiffDirection {
    pub fn opposite(self) -> Self {
        match self {
            Self::Apply => Self::Revert,
            Self::Revert => Self::Apply,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Apply => "apply",
            Self::Revert => "revert",
        }
    }
}

/// A single coin output moving in one direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoinOutputDiff {
    pub direction: DiffDirection,
    pub id: OutputId,
    pub output: CoinOutput,
}

impl CoinOutputDiff {
    pub fn new(direction: DiffDirection, id: OutputId, output: CoinOutput) -> Self {
        Self {
            direction,
            id,
            output,
        }
    }

    /// The address the output is paid to.
    pub fn unlock_hash(&self) -> &UnlockHash {
        &self.output.unlock_hash
    }

    /// The same diff with its direction flipped.
    pub fn inverse(&self) -> Self {
        Self {
            direction: self.direction.opposite(),
            ..*self
        }
    }
}

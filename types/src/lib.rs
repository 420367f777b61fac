//! Fundamental types for the Cirrus storage network.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! identifiers, amounts, coin outputs, output diffs and consensus changes.

pub mod address;
pub mod amount;
pub mod block;
pub mod consensus;
pub mod diff;
pub mod error;
pub mod hash;
pub mod output;

pub use address::UnlockHash;
pub use amount::Currency;
pub use block::BlockId;
pub use consensus::ConsensusChange;
pub use diff::{CoinOutputDiff, DiffDirection};
pub use error::TypesError;
pub use hash::{OutputId, TransactionId};
pub use output::CoinOutput;

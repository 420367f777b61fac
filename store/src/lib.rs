//! Abstract storage traits for the Cirrus wallet.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The wallet depends only on the traits.

pub mod error;
pub mod wallet;

pub use error::StoreError;
pub use wallet::{KeyRecord, OutputRecord, WalletRecord, WalletStore};

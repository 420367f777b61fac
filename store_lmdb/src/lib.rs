//! LMDB storage backend for the Cirrus wallet.
//!
//! Implements the `cirrus-store` traits using the `heed` LMDB bindings.
//! Keys and metadata live in two named databases within a single environment.

pub mod environment;
pub mod error;
pub mod wallet;

pub use environment::{LmdbEnvironment, CURRENT_SCHEMA_VERSION};
pub use error::LmdbError;
pub use wallet::LmdbWalletStore;

//! Wallet core library for Cirrus.
//!
//! Tracks every coin output paid to the wallet's keys and keeps that view
//! equal to "confirmed chain plus current transaction pool":
//! - Key registry of observed outputs, never deleted, only deactivated
//! - Diff applier moving one output per diff
//! - Update coordinator unwinding and re-overlaying the pool on every change
//! - Age counter following net chain progress
//! - Subscriber notification after each successful update

pub mod age;
pub mod applier;
pub mod config;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod subscriber;
pub mod update;
pub mod wallet;

pub use age::AgeCounter;
pub use applier::DiffOutcome;
pub use config::{Strictness, WalletConfig};
pub use error::WalletError;
pub use metrics::WalletMetrics;
pub use registry::{KeyRegistry, KnownOutput, SpendableKey};
pub use subscriber::{SubscriberId, WalletSubscriber};
pub use update::ReconcileSummary;
pub use wallet::Wallet;

//! Wallet configuration with TOML file support.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use cirrus_types::UnlockHash;
use cirrus_utils::LogFormat;
use serde::{Deserialize, Serialize};

use crate::WalletError;

/// What the wallet does when asked to revert an output it never observed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// Abort the whole update with [`WalletError::UnknownOutput`], leaving
    /// the wallet exactly as it was before the update.
    Strict,
    /// Log a warning, count the anomaly and continue as if the revert
    /// succeeded.
    #[default]
    Lenient,
}

impl Strictness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Lenient => "lenient",
        }
    }
}

impl fmt::Display for Strictness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strictness {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            other => Err(WalletError::Config(format!(
                "unknown strictness {other:?} (expected \"strict\" or \"lenient\")"
            ))),
        }
    }
}

/// Configuration for a wallet.
///
/// Can be loaded from a TOML file via [`WalletConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Directory holding the wallet database.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Policy for reverting outputs the wallet never observed.
    #[serde(default)]
    pub strictness: Strictness,

    /// Unlock hashes the wallet controls (hex).
    #[serde(default)]
    pub keys: Vec<UnlockHash>,

    /// Whether to write the wallet to its store after every update, key
    /// registration included.
    #[serde(default = "default_true")]
    pub persist_on_update: bool,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Maximum size of the LMDB memory map, in bytes.
    #[serde(default = "default_lmdb_map_size")]
    pub lmdb_map_size: usize,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./cirrus_data")
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_lmdb_map_size() -> usize {
    64 * 1024 * 1024
}

// ── Impl ───────────────────────────────────────────────────────────────

impl WalletConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, WalletError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| WalletError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, WalletError> {
        toml::from_str(s).map_err(|e| WalletError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, WalletError> {
        toml::to_string_pretty(self).map_err(|e| WalletError::Config(e.to_string()))
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            strictness: Strictness::default(),
            keys: Vec::new(),
            persist_on_update: default_true(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            lmdb_map_size: default_lmdb_map_size(),
        }
    }
}

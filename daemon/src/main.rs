//! Cirrus wallet daemon: opens a wallet on LMDB and feeds it updates.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use cirrus_store_lmdb::{LmdbEnvironment, LmdbWalletStore};
use cirrus_types::{CoinOutputDiff, ConsensusChange, UnlockHash};
use cirrus_utils::LogFormat;
use cirrus_wallet::{Strictness, Wallet, WalletConfig};
use clap::Parser;
use serde::Deserialize;

#[derive(Parser)]
#[command(name = "cirrus-walletd", about = "Cirrus wallet reconciliation daemon")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "CIRRUS_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for the wallet database.
    #[arg(long, env = "CIRRUS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Policy for reverts of unknown outputs: "strict" or "lenient".
    #[arg(long, env = "CIRRUS_STRICTNESS")]
    strictness: Option<Strictness>,

    /// Unlock hash (64 hex characters) to track. Repeatable.
    #[arg(long = "key", env = "CIRRUS_KEYS", value_delimiter = ',')]
    keys: Vec<UnlockHash>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "CIRRUS_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "CIRRUS_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Apply a JSON file of updates in order.
    Replay {
        /// JSON array of `{ "change": …, "unconfirmed": […] }` objects.
        file: PathBuf,

        /// Print Prometheus metrics after the replay.
        #[arg(long)]
        metrics: bool,
    },
    /// Print the spendable balance.
    Balance,
    /// List spendable outputs.
    Outputs,
    /// Print the effective configuration as TOML.
    Config,
}

/// One entry of a replay file.
#[derive(Deserialize)]
struct Update {
    #[serde(default)]
    change: ConsensusChange,
    #[serde(default)]
    unconfirmed: Vec<CoinOutputDiff>,
}

impl Cli {
    /// Build the effective configuration: file (or defaults) first, then
    /// any flag or env var that was given.
    fn resolve_config(&self) -> anyhow::Result<WalletConfig> {
        let mut config = match &self.config {
            Some(path) => WalletConfig::from_toml_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => WalletConfig::default(),
        };

        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        if let Some(strictness) = self.strictness {
            config.strictness = strictness;
        }
        for key in &self.keys {
            if !config.keys.contains(key) {
                config.keys.push(*key);
            }
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        Ok(config)
    }
}

fn open_wallet(config: &WalletConfig) -> anyhow::Result<Wallet> {
    let env = LmdbEnvironment::open(&config.data_dir, config.lmdb_map_size)
        .with_context(|| format!("opening database in {}", config.data_dir.display()))?;
    let store = Arc::new(LmdbWalletStore::new(env));
    Ok(Wallet::open(config, store)?)
}

async fn replay(wallet: Arc<Wallet>, file: &Path) -> anyhow::Result<()> {
    let contents = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    let updates: Vec<Update> = serde_json::from_str(&contents)
        .with_context(|| format!("parsing {}", file.display()))?;

    let weak = Arc::downgrade(&wallet);
    let subscription = wallet.subscribe(Arc::new(move || {
        if let Some(wallet) = weak.upgrade() {
            tracing::info!(
                balance = %wallet.spendable_balance(),
                age = wallet.age(),
                "wallet balance"
            );
        }
    }));

    tracing::info!(
        updates = updates.len(),
        file = %file.display(),
        strictness = %wallet.strictness(),
        "replaying updates"
    );
    for (index, update) in updates.into_iter().enumerate() {
        let summary = wallet
            .receive_update(&update.change, update.unconfirmed)
            .with_context(|| format!("update #{index}"))?;
        tracing::info!(
            index,
            created = summary.created,
            reactivated = summary.reactivated,
            deactivated = summary.deactivated,
            age = summary.age,
            "update applied"
        );
    }
    wallet.unsubscribe(subscription);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    cirrus_utils::init_logging(config.log_format, &config.log_level);

    if let Command::Config = cli.command {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let wallet = Arc::new(open_wallet(&config)?);

    match cli.command {
        Command::Replay { file, metrics } => {
            replay(Arc::clone(&wallet), &file).await?;
            println!("balance: {}", wallet.spendable_balance());
            println!("age: {}", wallet.age());
            if metrics {
                print!("{}", wallet.metrics().encode()?);
            }
        }
        Command::Balance => {
            println!("{}", wallet.spendable_balance());
        }
        Command::Outputs => {
            for output in wallet.spendable_outputs() {
                println!(
                    "{} {} {}",
                    output.id(),
                    output.output().unlock_hash,
                    output.value()
                );
            }
        }
        Command::Config => {}
    }

    tracing::info!("cirrus-walletd exited cleanly");
    Ok(())
}

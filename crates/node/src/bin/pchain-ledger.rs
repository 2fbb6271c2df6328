// Path: crates/node/src/bin/pchain-ledger.rs
#![forbid(unsafe_code)]

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use pchain_node::{advance_to, status, supernet_or_primary};
use pchain_state::{validator_set, validator_set_at, ConfiguredRewards, State};
use pchain_storage::RedbStore;
use pchain_telemetry::{LogFormat, ScopeTimer};
use pchain_types::config::LedgerConfig;
use pchain_types::ledger::ValidatorEntry;
use pchain_types::Id;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Operator tool for the platform chain staking ledger.
#[derive(Parser, Debug)]
#[command(name = "pchain-ledger", author, version, about, long_about = None)]
struct LedgerOpts {
    /// Path to the ledger.toml configuration file.
    #[arg(long, env = "PCHAIN_LEDGER_CONFIG", default_value = "ledger.toml")]
    config: PathBuf,

    /// Log record format on stderr (json or pretty).
    #[arg(long, default_value = "json")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: LedgerCommand,
}

#[derive(Subcommand, Debug)]
enum LedgerCommand {
    /// Writes the configured genesis into an empty database.
    Init,
    /// Prints a supernet's validator set.
    Validators {
        /// Supernet id in hex; the primary network when omitted.
        #[arg(long)]
        supernet: Option<Id>,
        /// Reconstruct the set as of this committed height.
        #[arg(long)]
        height: Option<u64>,
    },
    /// Moves chain time forward, committing one height per staker change.
    Advance {
        /// Target unix time in seconds.
        #[arg(long)]
        to: u64,
        /// Return due rewards to the pool instead of paying them out.
        #[arg(long)]
        forfeit_rewards: bool,
    },
    /// Prints height, chain time and supplies.
    Status {
        /// Supernet id in hex; the primary network when omitted.
        #[arg(long)]
        supernet: Option<Id>,
    },
}

#[derive(Serialize)]
struct ValidatorView {
    node_id: String,
    weight: u64,
    public_key: Option<String>,
}

impl From<ValidatorEntry> for ValidatorView {
    fn from(entry: ValidatorEntry) -> Self {
        Self {
            node_id: entry.node_id.to_string(),
            weight: entry.weight,
            public_key: entry.public_key.map(hex::encode),
        }
    }
}

fn load_config(path: &PathBuf) -> Result<LedgerConfig> {
    let config_str = fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config {}: {e}", path.display()))?;
    let config: LedgerConfig = toml::from_str(&config_str)?;
    config.validate().map_err(|e| anyhow!(e))?;
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let opts = LedgerOpts::parse();
    pchain_telemetry::init_tracing(opts.log_format, "info")?;
    tracing::info!(
        target: "ledger",
        event = "startup",
        config = ?opts.config
    );

    let config = load_config(&opts.config)?;
    let store = Arc::new(RedbStore::open(&config.db_path)?);

    match opts.command {
        LedgerCommand::Init => {
            let state = State::from_genesis(store, &config.genesis, &config.staking)?;
            tracing::info!(
                target: "ledger",
                event = "genesis",
                validators = config.genesis.validators.len(),
                height = state.height()
            );
        }
        LedgerCommand::Validators { supernet, height } => {
            let state = State::load(store)?;
            let supernet_id = supernet_or_primary(supernet);
            let set = match height {
                Some(h) => validator_set_at(&state, &supernet_id, h)?,
                None => validator_set(&state, &supernet_id)?,
            };
            let view: Vec<ValidatorView> = set.into_iter().map(ValidatorView::from).collect();
            print_json(&view)?;
        }
        LedgerCommand::Advance {
            to,
            forfeit_rewards,
        } => {
            let _timer = ScopeTimer::new("advance");
            let mut state = State::load(store)?;
            let rewards = ConfiguredRewards::new(config.staking.reward.clone());
            let steps = advance_to(&mut state, &rewards, to, !forfeit_rewards)?;
            print_json(&steps)?;
        }
        LedgerCommand::Status { supernet } => {
            let state = State::load(store)?;
            print_json(&status(&state, &supernet_or_primary(supernet))?)?;
        }
    }
    Ok(())
}

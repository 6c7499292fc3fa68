use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::api::ContractAddresses;
use crate::events::DisconnectedRange;

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    /// Short chain identifier, used in proposal links.
    pub id: String,
    pub name: String,
    pub ws_url: String,
    pub retry_interval_secs: u64,
}

impl ChainConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    pub skip_catchup: bool,
    pub start_block: Option<u64>,
    pub end_block: Option<u64>,
    pub fetch_all_completed: bool,
    pub verbose: bool,
    /// Where the last ingested block is kept between runs.
    pub state_file: PathBuf,
}

impl IngestConfig {
    /// Catch-up range when nothing has been ingested yet.
    pub fn initial_range(&self) -> DisconnectedRange {
        DisconnectedRange {
            start_block: self.start_block,
            end_block: self.end_block,
            max_results: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertsConfig {
    pub webhook_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub chain: ChainConfig,
    pub contracts: ContractAddresses,
    pub ingest: IngestConfig,
    pub alerts: AlertsConfig,
    pub log_level: String,
}

impl AppConfig {
    /// Loads `config.toml` from the working directory, then applies
    /// `WATCHDOG__SECTION__KEY` environment overrides.
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_builder(Config::builder().add_source(File::with_name("config").required(false)))
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        let mut config: Self = builder
            .set_default("chain.id", "ethereum")?
            .set_default("chain.name", "Ethereum")?
            .set_default("chain.ws_url", "ws://127.0.0.1:8545")?
            .set_default("chain.retry_interval_secs", 10)?
            .set_default("ingest.skip_catchup", false)?
            .set_default("ingest.fetch_all_completed", false)?
            .set_default("ingest.verbose", false)?
            .set_default("ingest.state_file", "watchdog_state.json")?
            .set_default("alerts.webhook_url", "")?
            .set_default("log_level", "info")?
            .add_source(
                Environment::with_prefix("WATCHDOG")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        // Plain RPC_URL from .env still wins, for quick local setups.
        if let Ok(url) = std::env::var("RPC_URL") {
            config.chain.ws_url = url;
        }
        Ok(config)
    }
}

//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── cosmos: CosmosConfig      # Endpoint, key, timeouts, paging
//! └── scenario: ScenarioConfig  # Database, container, partition key, throughput
//! ```
//!
//! Every option can be given as a flag or an environment variable.
//!
//! ```bash
//! docket --cosmos-endpoint https://localhost:8081/ --cosmos-key "$KEY"
//!
//! COSMOS_ENDPOINT=https://localhost:8081/ COSMOS_KEY="$KEY" DOCKET_DATABASE=shop docket
//! ```

mod scenario;

use std::process;

use anyhow::Context;
use clap::Parser;
use docket_cosmos::CosmosConfig;
pub use scenario::ScenarioConfig;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "docket")]
#[command(about = "Runs the docket sample scenario against a Cosmos DB account")]
#[command(version)]
pub struct Cli {
    /// Account connection settings.
    #[clap(flatten)]
    pub cosmos: CosmosConfig,

    /// Resources the scenario provisions and uses.
    #[clap(flatten)]
    pub scenario: ScenarioConfig,
}

impl Cli {
    /// Loads a `.env` file (if enabled) and parses CLI arguments.
    ///
    /// The file is read first so that clap picks its values up as
    /// environment defaults.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Initializes tracing with environment-based filtering.
    ///
    /// Logs go to stderr so that scenario output on stdout stays clean.
    pub fn init_tracing() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    /// Validates all configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.cosmos
            .validate()
            .context("invalid Cosmos DB configuration")?;
        self.scenario
            .validate()
            .context("invalid scenario configuration")?;
        Ok(())
    }

    /// Logs configuration (no secrets).
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "Build information"
        );

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            endpoint = %self.cosmos.cosmos_endpoint,
            timeout_secs = self.cosmos.timeout().as_secs(),
            max_item_count = ?self.cosmos.cosmos_max_item_count,
            "Cosmos DB configuration"
        );

        self.scenario.log();
    }

    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}

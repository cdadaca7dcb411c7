//! Scenario resource configuration.

use anyhow::{Result as AnyhowResult, anyhow};
use clap::Args;
use docket_core::types::MIN_THROUGHPUT;
use docket_core::{ContainerSpec, Document, PartitionKeyPath};
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET_CONFIG;
use crate::scenario::Product;

/// Database and container used by the scenario.
///
/// # Environment Variables
///
/// - `DOCKET_DATABASE` - Database name (default: testdb)
/// - `DOCKET_CONTAINER` - Container name (default: container)
/// - `DOCKET_PARTITION_KEY_PATH` - Partition key path (default: /categoryId)
/// - `DOCKET_THROUGHPUT` - Provisioned throughput in RU/s (default: 400)
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
#[must_use = "config does nothing unless you use it"]
pub struct ScenarioConfig {
    /// Database to create if absent.
    #[arg(long, env = "DOCKET_DATABASE", default_value = "testdb")]
    pub database: String,

    /// Container to create if absent.
    #[arg(long, env = "DOCKET_CONTAINER", default_value = "container")]
    pub container: String,

    /// Partition key path of the container, e.g. `/categoryId`.
    ///
    /// Must name a scalar field of the sample product.
    #[arg(long, env = "DOCKET_PARTITION_KEY_PATH", default_value = "/categoryId")]
    pub partition_key_path: String,

    /// Throughput in request units per second, at least 400.
    #[arg(long, env = "DOCKET_THROUGHPUT", default_value_t = MIN_THROUGHPUT)]
    pub throughput: u32,
}

impl ScenarioConfig {
    /// Validates the resource settings without contacting the store.
    ///
    /// # Errors
    ///
    /// Returns an error if a name is empty, the partition key path is
    /// malformed or absent from the sample product, or the throughput is
    /// below the service minimum.
    pub fn validate(&self) -> AnyhowResult<()> {
        if self.database.trim().is_empty() {
            return Err(anyhow!("Database name cannot be empty"));
        }

        let spec = self.container_spec()?;
        spec.validate()?;

        let sample = Document::from_typed(&Product::surfboard())?;
        if spec.partition_key.extract(&sample).is_err() {
            return Err(anyhow!(
                "Partition key path '{}' does not name a field of the sample product",
                spec.partition_key
            ));
        }

        Ok(())
    }

    /// Builds the container specification.
    pub fn container_spec(&self) -> docket_core::Result<ContainerSpec> {
        let partition_key = PartitionKeyPath::new(self.partition_key_path.as_str())?;
        Ok(ContainerSpec::new(self.container.as_str(), partition_key)
            .with_throughput(self.throughput))
    }

    pub(crate) fn log(&self) {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            database = %self.database,
            container = %self.container,
            partition_key_path = %self.partition_key_path,
            throughput = self.throughput,
            "Scenario configuration"
        );
    }
}

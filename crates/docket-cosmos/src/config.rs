//! Cosmos DB gateway configuration.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
#[cfg(feature = "config")]
use clap::Args;
use docket_core::{Error, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Default timeout for HTTP requests: 30 seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for a Cosmos DB account.
#[derive(Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct CosmosConfig {
    /// Account endpoint, e.g. `https://<account>.documents.azure.com:443/`
    #[cfg_attr(feature = "config", arg(long = "cosmos-endpoint", env = "COSMOS_ENDPOINT"))]
    pub cosmos_endpoint: String,

    /// Base64-encoded account master key
    #[cfg_attr(
        feature = "config",
        arg(long = "cosmos-key", env = "COSMOS_KEY", hide_env_values = true)
    )]
    #[serde(skip_serializing, default)]
    pub cosmos_key: String,

    /// HTTP request timeout in seconds
    #[cfg_attr(
        feature = "config",
        arg(long = "cosmos-timeout", env = "COSMOS_TIMEOUT_SECS", default_value = "30")
    )]
    #[serde(default = "default_timeout_secs")]
    pub cosmos_timeout: u64,

    /// Maximum number of documents per query page (store default when unset)
    #[cfg_attr(
        feature = "config",
        arg(long = "cosmos-max-item-count", env = "COSMOS_MAX_ITEM_COUNT")
    )]
    #[serde(default)]
    pub cosmos_max_item_count: Option<u32>,

    /// User-Agent header to send with requests
    #[cfg_attr(
        feature = "config",
        arg(long = "cosmos-user-agent", env = "COSMOS_USER_AGENT")
    )]
    #[serde(default)]
    pub cosmos_user_agent: Option<String>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl CosmosConfig {
    /// Creates a configuration for an endpoint and master key.
    pub fn new(endpoint: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            cosmos_endpoint: endpoint.into(),
            cosmos_key: key.into(),
            cosmos_timeout: DEFAULT_TIMEOUT_SECS,
            cosmos_max_item_count: None,
            cosmos_user_agent: None,
        }
    }

    /// Returns the request timeout, using the default if zero.
    pub fn timeout(&self) -> Duration {
        match self.cosmos_timeout {
            0 => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            secs => Duration::from_secs(secs),
        }
    }

    /// Returns the effective user agent, using the default if not set.
    pub fn user_agent(&self) -> String {
        self.cosmos_user_agent
            .clone()
            .unwrap_or_else(|| format!("docket/{}", env!("CARGO_PKG_VERSION")))
    }

    /// Parses the endpoint.
    pub fn endpoint(&self) -> Result<Url> {
        let url = Url::parse(&self.cosmos_endpoint).map_err(|e| {
            Error::configuration()
                .with_message(format!("invalid endpoint '{}'", self.cosmos_endpoint))
                .with_source(e)
        })?;

        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(Error::configuration()
                .with_message(format!("endpoint '{url}' must be an http(s) URL")));
        }

        Ok(url)
    }

    /// Decodes the master key.
    pub fn key_bytes(&self) -> Result<Vec<u8>> {
        if self.cosmos_key.trim().is_empty() {
            return Err(Error::configuration().with_message("account key cannot be empty"));
        }

        STANDARD.decode(self.cosmos_key.trim()).map_err(|e| {
            Error::configuration()
                .with_message("account key is not valid base64")
                .with_source(e)
        })
    }

    /// Set the timeout in seconds.
    #[must_use]
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.cosmos_timeout = timeout_secs;
        self
    }

    /// Set the maximum number of documents per query page.
    #[must_use]
    pub fn with_max_item_count(mut self, max_item_count: u32) -> Self {
        self.cosmos_max_item_count = Some(max_item_count);
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.cosmos_user_agent = Some(user_agent.into());
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the endpoint is not an http(s) URL,
    /// the key is empty or not base64, or the page size is zero.
    pub fn validate(&self) -> Result<()> {
        self.endpoint()?;
        self.key_bytes()?;

        if self.cosmos_max_item_count == Some(0) {
            return Err(
                Error::configuration().with_message("max item count must be greater than zero")
            );
        }

        Ok(())
    }
}

impl std::fmt::Debug for CosmosConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CosmosConfig")
            .field("endpoint", &self.cosmos_endpoint)
            .field("key", &"***")
            .field("timeout", &self.cosmos_timeout)
            .field("max_item_count", &self.cosmos_max_item_count)
            .field("user_agent", &self.cosmos_user_agent)
            .finish()
    }
}

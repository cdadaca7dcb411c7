#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for Cosmos DB client operations.
///
/// Use this target for logging client construction, request outcomes, request
/// charges and service errors.
pub const TRACING_TARGET_CLIENT: &str = "docket_cosmos::client";

mod auth;
mod client;
mod config;
mod error;

pub use client::{API_VERSION, CosmosGateway};
pub use config::{CosmosConfig, DEFAULT_TIMEOUT_SECS};
pub use error::{Error, Result, classify};

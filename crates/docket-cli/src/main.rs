#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod scenario;
mod signal;

use std::process;
use std::sync::Arc;

use anyhow::Context;
use docket_core::DocumentSession;
use docket_cosmos::CosmosGateway;
use tokio_util::sync::CancellationToken;

use crate::config::Cli;

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "docket_cli::startup";
pub const TRACING_TARGET_SHUTDOWN: &str = "docket_cli::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "docket_cli::config";
pub const TRACING_TARGET_SCENARIO: &str = "docket_cli::scenario";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::info!(
            target: TRACING_TARGET_SHUTDOWN,
            "scenario completed successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SHUTDOWN,
            error = %error,
            "scenario terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    Cli::init_tracing();
    cli.log();
    cli.validate()?;

    let gateway =
        CosmosGateway::new(cli.cosmos.clone()).context("failed to create Cosmos DB gateway")?;

    let shutdown = CancellationToken::new();
    let session = DocumentSession::with_cancellation(Arc::new(gateway), &shutdown);
    let signal = tokio::spawn(signal::cancel_on_signal(shutdown.clone()));

    let mut stdout = std::io::stdout().lock();
    let result = scenario::run(&session, &cli.scenario, &mut stdout).await;

    signal.abort();
    result
}

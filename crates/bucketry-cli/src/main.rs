//! Bucketry CLI - folder-size reports from object-storage inventories.
//!
//! The main entry point for the `bucketry` binary.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bucketry_cli::Cli;

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Create runtime and execute
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        tokio::select! {
            result = bucketry_cli::execute(&cli) => result,
            _ = tokio::signal::ctrl_c() => {
                // Exit without emitting a partial report; cache files are
                // only ever written after verification, so an interrupted
                // download leaves no trusted-but-unverified state behind.
                tracing::warn!("interrupted, exiting");
                Err(anyhow::anyhow!("interrupted"))
            }
        }
    })
}

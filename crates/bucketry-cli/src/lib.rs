//! # bucketry-cli
//!
//! Command-line interface for Bucketry inventory reports.
//!
//! ```bash
//! # Print a folder-size table for an inventory
//! bucketry -m s3://inv-bucket/example-data/daily/2024-01-01T00-00Z/
//!
//! # Cap aggregation depth and write the report as CSV
//! bucketry -m s3://inv-bucket/example-data/daily/ -d 2 -o report.csv
//!
//! # Cache data files locally for repeated runs
//! bucketry -m s3://inv-bucket/example-data/daily/ -c ./inventory-cache
//! ```
//!
//! ## Configuration
//!
//! Storage credentials come from the standard AWS environment variables.
//! `RUST_LOG` controls log verbosity (default `info`).

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
// CLI uses print! macros intentionally
#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::Parser;
use tracing::info;

use bucketry_core::{
    load_manifest, process_inventory, ProcessOptions, ProgressCounter, ProgressReporter,
    S3Backend, S3Location, StorageBackend,
};

/// Bucketry - folder-size reports from object-storage inventories.
#[derive(Debug, Parser)]
#[command(name = "bucketry")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// S3 folder containing the inventory manifest (or the manifest.json
    /// object itself).
    #[arg(short = 'm', long = "manifest", env = "BUCKETRY_MANIFEST")]
    pub manifest: String,

    /// Deepest folder level to aggregate; deeper objects roll up into
    /// this level.
    #[arg(short = 'd', long = "max-depth")]
    pub max_depth: Option<u32>,

    /// Local directory for caching verified inventory data files.
    #[arg(short = 'c', long = "cache-dir", env = "BUCKETRY_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Report destination: a local path or an s3:// location (CSV).
    /// Prints a table to stdout when omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<String>,

    /// Seconds between progress log lines.
    #[arg(long = "progress-secs", default_value = "10")]
    pub progress_secs: u64,
}

/// Runs the report pipeline for the parsed arguments.
///
/// # Errors
///
/// Returns an error on any fatal pipeline failure (unreachable manifest,
/// integrity mismatch, unsupported format) or on failure to write the
/// report to its destination.
pub async fn execute(cli: &Cli) -> Result<()> {
    let backend: Arc<dyn StorageBackend> = Arc::new(S3Backend::new());

    let manifest = load_manifest(backend.as_ref(), &cli.manifest).await?;
    info!(
        files = manifest.files.len(),
        format = %manifest.file_format,
        "manifest loaded"
    );

    let options = ProcessOptions {
        max_depth: cli.max_depth,
        cache_dir: cli.cache_dir.clone(),
    };
    let progress = Arc::new(ProgressCounter::new());
    let reporter = ProgressReporter::spawn(
        Arc::clone(&progress),
        Duration::from_secs(cli.progress_secs.max(1)),
    );

    let result = process_inventory(Arc::clone(&backend), &manifest, &options, &progress).await;
    reporter.finish().await;
    let report = result?;

    match &cli.output {
        None => print!("{}", report.render_table()),
        Some(out) if out.starts_with("s3://") => {
            let dest = S3Location::parse(out)?;
            backend
                .put(&dest.bucket, &dest.key, Bytes::from(report.to_csv()))
                .await?;
            info!(destination = %dest, "wrote inventory report");
        }
        Some(out) => {
            std::fs::write(out, report.to_csv())
                .with_context(|| format!("failed to write report to {out}"))?;
            info!(destination = %out, "wrote inventory report");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_all_flags() {
        let cli = Cli::parse_from([
            "bucketry",
            "-m",
            "s3://inv-bucket/example-data/daily/",
            "-d",
            "3",
            "-c",
            "/tmp/inventory-cache",
            "-o",
            "report.csv",
        ]);

        assert_eq!(cli.manifest, "s3://inv-bucket/example-data/daily/");
        assert_eq!(cli.max_depth, Some(3));
        assert_eq!(cli.cache_dir.as_deref(), Some(std::path::Path::new("/tmp/inventory-cache")));
        assert_eq!(cli.output.as_deref(), Some("report.csv"));
        assert_eq!(cli.progress_secs, 10);
    }

    #[test]
    fn test_cli_requires_manifest() {
        assert!(Cli::try_parse_from(["bucketry"]).is_err());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["bucketry", "--manifest", "s3://inv-bucket/daily/"]);
        assert_eq!(cli.max_depth, None);
        assert_eq!(cli.cache_dir, None);
        assert_eq!(cli.output, None);
    }
}

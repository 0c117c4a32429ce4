//! # s3sync
//!
//! Mirrors an S3 prefix into a local directory, or turns the `.crt`/`.key`
//! objects under it into Kubernetes TLS secrets, and runs a command when
//! anything changed.
//!
//! See [`s3sync::cli`] for the available options.

use anyhow::{Context, Result};
use clap::Parser;
use s3sync::cli::{Cli, Commands};
use s3sync::observability::metrics;
use s3sync::runtime::initialize;
use tracing::warn;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let Commands::Sync(args) = &cli.command;

    let init = initialize(&cli.options, args).await?;
    let outcome = init.reconciler.run().await;

    if let Some(path) = &init.metrics_file {
        if let Err(e) = metrics::write_textfile(path) {
            warn!("Could not write metrics: {:#}", e);
        }
    }

    let report = outcome.context("Sync failed")?;
    // Per-object failures were logged where they happened and do not fail the run
    if !report.failures.is_empty() {
        warn!(
            "{} objects could not be synced: {}",
            report.failures.len(),
            report
                .failures
                .iter()
                .map(|f| format!("{} ({})", f.key, f.kind.as_str()))
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    Ok(())
}

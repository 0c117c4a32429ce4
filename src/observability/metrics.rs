//! # Metrics
//!
//! Prometheus metrics for a sync run.
//!
//! The binary is short-lived, so instead of serving `/metrics` the registry
//! is written in text exposition format to a file at the end of the run,
//! where a node-exporter textfile collector picks it up.
//!
//! ## Metrics Exposed
//!
//! - `s3sync_runs_total` - Total number of sync runs, by mode and result
//! - `s3sync_run_duration_seconds` - Duration of sync runs
//! - `s3sync_objects_listed_total` - Objects seen in the listing after filtering
//! - `s3sync_objects_fetched_total` - Objects written to disk or absorbed into secrets
//! - `s3sync_objects_deleted_total` - Local files removed by force mode
//! - `s3sync_object_errors_total` - Per-object failures, by operation
//! - `s3sync_secrets_published_total` - Secrets written to Kubernetes, by outcome

use anyhow::{Context, Result};
use prometheus::{Encoder, Histogram, IntCounter, IntCounterVec, Registry, TextEncoder};
use std::path::Path;
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RUNS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new("s3sync_runs_total", "Total number of sync runs"),
        &["mode", "result"],
    )
    .expect("Failed to create RUNS_TOTAL metric - this should never happen")
});

static RUN_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "s3sync_run_duration_seconds",
            "Duration of sync runs in seconds",
        )
        .buckets(vec![0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0]),
    )
    .expect("Failed to create RUN_DURATION metric - this should never happen")
});

static OBJECTS_LISTED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "s3sync_objects_listed_total",
        "Objects seen in the remote listing after filtering",
    )
    .expect("Failed to create OBJECTS_LISTED_TOTAL metric - this should never happen")
});

static OBJECTS_FETCHED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "s3sync_objects_fetched_total",
        "Objects fetched from the remote store",
    )
    .expect("Failed to create OBJECTS_FETCHED_TOTAL metric - this should never happen")
});

static OBJECTS_DELETED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "s3sync_objects_deleted_total",
        "Local files deleted because they are no longer listed remotely",
    )
    .expect("Failed to create OBJECTS_DELETED_TOTAL metric - this should never happen")
});

static OBJECT_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new("s3sync_object_errors_total", "Per-object failures"),
        &["operation"],
    )
    .expect("Failed to create OBJECT_ERRORS_TOTAL metric - this should never happen")
});

static SECRETS_PUBLISHED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "s3sync_secrets_published_total",
            "Secrets written to the secret store",
        ),
        &["outcome"],
    )
    .expect("Failed to create SECRETS_PUBLISHED_TOTAL metric - this should never happen")
});

pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RUNS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RUN_DURATION.clone()))?;
    REGISTRY.register(Box::new(OBJECTS_LISTED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(OBJECTS_FETCHED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(OBJECTS_DELETED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(OBJECT_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SECRETS_PUBLISHED_TOTAL.clone()))?;
    Ok(())
}

pub fn record_run(mode: &str, success: bool, duration: f64) {
    let result = if success { "success" } else { "failure" };
    RUNS_TOTAL.with_label_values(&[mode, result]).inc();
    RUN_DURATION.observe(duration);
}

pub fn increment_objects_listed() {
    OBJECTS_LISTED_TOTAL.inc();
}

pub fn increment_objects_fetched() {
    OBJECTS_FETCHED_TOTAL.inc();
}

pub fn increment_objects_deleted() {
    OBJECTS_DELETED_TOTAL.inc();
}

pub fn increment_object_errors(operation: &str) {
    OBJECT_ERRORS_TOTAL.with_label_values(&[operation]).inc();
}

pub fn increment_secrets_published(outcome: &str) {
    SECRETS_PUBLISHED_TOTAL.with_label_values(&[outcome]).inc();
}

/// Render the registry in Prometheus text format
pub fn render() -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&REGISTRY.gather(), &mut buffer)
        .context("Failed to encode metrics")?;
    String::from_utf8(buffer).context("Metrics output is not valid UTF-8")
}

/// Write the registry to `path`, replacing it atomically so collectors never read a partial file
pub fn write_textfile(path: &Path) -> Result<()> {
    let rendered = render()?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to stage metrics file in {}", parent.display()))?;
    std::io::Write::write_all(&mut staged, rendered.as_bytes())
        .context("Failed to write metrics")?;
    staged
        .persist(path)
        .with_context(|| format!("Failed to write metrics file {}", path.display()))?;
    Ok(())
}

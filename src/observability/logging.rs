//! # Logging
//!
//! Installs the global `tracing` subscriber. `RUST_LOG` takes precedence;
//! otherwise the crate logs at `info`, or `debug` when verbose output was
//! requested.

use tracing_subscriber::EnvFilter;

/// Default filter directive for the given verbosity
#[must_use]
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "s3sync=debug"
    } else {
        "s3sync=info"
    }
}

/// Install the global subscriber; a second call is a no-op
pub fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
    {
        eprintln!("Tracing subscriber already initialized: {e}");
    }
}

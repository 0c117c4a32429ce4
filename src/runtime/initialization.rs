//! # Initialization
//!
//! rustls setup, tracing, metrics registration, and construction of the
//! object store and secret publisher a run needs.

use crate::cli::{GlobalOptions, SyncArgs};
use crate::config::{SyncMode, TuningConfig};
use crate::controller::address::parse_address;
use crate::controller::reconciler::Reconciler;
use crate::observability;
use crate::provider::S3ObjectStore;
use crate::secrets::kubernetes::KubeSecretPublisher;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Everything `main` needs to run one sync
pub struct InitializationResult {
    pub reconciler: Reconciler,
    /// Where to write metrics when the run ends
    pub metrics_file: Option<PathBuf>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("reconciler", &self.reconciler)
            .field("metrics_file", &self.metrics_file)
            .finish()
    }
}

/// Prepare a sync run from the parsed command line.
///
/// # Errors
///
/// Fails on an invalid address, a missing destination, or when the S3
/// client or Kubernetes API server cannot be set up.
pub async fn initialize(options: &GlobalOptions, args: &SyncArgs) -> Result<InitializationResult> {
    observability::logging::init_tracing(options.verbose);

    // Required for rustls 0.23+ when no default provider is selected via features
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("rustls crypto provider was already installed");
    }

    info!(
        "s3sync {} (build {} {})",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_GIT_HASH"),
        env!("BUILD_DATETIME")
    );

    observability::metrics::register_metrics().context("Failed to register metrics")?;

    let config = options.sync_config(args)?;
    // Reject bad addresses before any client is built
    let address = parse_address(&config.source)
        .with_context(|| format!("Invalid source {:?}", config.source))?;
    info!("Syncing {} in {} mode", address, config.mode.as_str());

    let tuning = TuningConfig::from_env();
    let store = S3ObjectStore::new(options.aws_region.as_deref(), options.s3_endpoint.as_deref())
        .await
        .context("Failed to create S3 client")?;

    let publisher = match &config.mode {
        SyncMode::Secrets {
            namespace,
            custom_label,
        } => Some(
            KubeSecretPublisher::connect(&tuning, namespace, custom_label.clone())
                .await
                .context("Failed to connect to the Kubernetes API server")?,
        ),
        SyncMode::Files { .. } => None,
    };

    let mut reconciler = Reconciler::new(config, tuning, Arc::new(store));
    if let Some(publisher) = publisher {
        reconciler = reconciler.with_publisher(Arc::new(publisher));
    }

    Ok(InitializationResult {
        reconciler,
        metrics_file: options.metrics_file.clone(),
    })
}

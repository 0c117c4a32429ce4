//! # CLI
//!
//! Command-line interface of the `s3sync` binary.
//!
//! Every option can also be supplied through an environment variable, so the
//! binary runs unchanged as a Kubernetes init container or cron job.
//!
//! ## Usage
//!
//! ```bash
//! # Mirror a prefix into a directory, reloading nginx on change
//! s3sync sync s3://certs/edge /etc/nginx/tls --exec-on-change "nginx -s reload"
//!
//! # Same, removing local files that are gone from the bucket
//! FORCE_SYNC=true s3sync sync s3://certs/edge /etc/nginx/tls
//!
//! # Publish *.crt/*.key pairs as TLS secrets instead
//! s3sync sync s3://certs/edge --create-k8s-secret --k8s-secret-namespace ingress
//! ```

use crate::config::{parse_bool_flag, SyncConfig, SyncMode};
use crate::constants::DEFAULT_SECRET_NAMESPACE;
use crate::secrets::kubernetes::CustomLabel;
use anyhow::{bail, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Environment variables consulted, in order, when `EXEC_ON_CHANGE` is unset
const ON_CHANGE_ALIASES: [&str; 2] = ["ON_CHANGE_EXEC", "ON_CHANGE"];

/// Sync an S3 prefix into a local directory or Kubernetes TLS secrets
#[derive(Parser, Debug)]
#[command(name = "s3sync", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub options: GlobalOptions,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Synchronize s3://BUCKET[/PREFIX] into LOCAL_DIR, or into TLS secrets
    Sync(SyncArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SyncArgs {
    /// Source location, s3://BUCKET[/PREFIX]
    #[arg(value_name = "S3_PATH")]
    pub source: String,

    /// Destination directory (file mode only)
    #[arg(value_name = "LOCAL_DIR")]
    pub destination: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Run a command in case of changes after sync
    #[arg(long, global = true, env = "EXEC_ON_CHANGE")]
    pub exec_on_change: Option<String>,

    /// Only sync keys matching this regular expression
    #[arg(long, global = true, env = "MATCH_REGEXP")]
    pub match_regexp: Option<String>,

    /// Skip keys matching this regular expression
    #[arg(long, global = true, env = "FILTER_OUT_REGEXP")]
    pub filter_out_regexp: Option<String>,

    /// Remove local files that are no longer present remotely
    #[arg(
        long,
        global = true,
        env = "FORCE_SYNC",
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_value = "false",
        default_missing_value = "true",
        value_parser = parse_flag
    )]
    pub force_sync: bool,

    /// Create TLS secrets on the Kubernetes cluster instead of local files
    #[arg(
        long,
        global = true,
        env = "CREATE_K8S_SECRET",
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_value = "false",
        default_missing_value = "true",
        value_parser = parse_flag
    )]
    pub create_k8s_secret: bool,

    /// Namespace the secrets are created in
    #[arg(long, global = true, env = "K8S_SECRET_NAMESPACE", default_value = DEFAULT_SECRET_NAMESPACE)]
    pub k8s_secret_namespace: String,

    /// Name of an extra label put on every secret
    #[arg(long, global = true, env = "K8S_CUSTOM_LABEL_NAME")]
    pub k8s_custom_label_name: Option<String>,

    /// Value of the extra label put on every secret
    #[arg(long, global = true, env = "K8S_CUSTOM_LABEL_VALUE")]
    pub k8s_custom_label_value: Option<String>,

    /// Verbose output
    #[arg(
        short,
        long,
        global = true,
        env = "VERBOSE",
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_value = "false",
        default_missing_value = "true",
        value_parser = parse_flag
    )]
    pub verbose: bool,

    /// Custom endpoint for S3-compatible stores (path-style addressing)
    #[arg(long, global = true, env = "S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// Region of the bucket; falls back to the AWS default chain
    #[arg(long, global = true, env = "AWS_REGION")]
    pub aws_region: Option<String>,

    /// Write Prometheus metrics to this file at the end of the run
    #[arg(long, global = true, env = "METRICS_FILE")]
    pub metrics_file: Option<PathBuf>,
}

fn parse_flag(value: &str) -> std::result::Result<bool, String> {
    Ok(parse_bool_flag(value))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

impl GlobalOptions {
    /// Change action, honouring the legacy variable names
    #[must_use]
    pub fn on_change(&self) -> Option<String> {
        if let Some(action) = non_empty(self.exec_on_change.as_deref()) {
            return Some(action.to_string());
        }
        ON_CHANGE_ALIASES
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|value| !value.trim().is_empty())
    }

    /// Build the run configuration for `args`.
    ///
    /// # Errors
    ///
    /// Fails when file mode is selected without a destination directory.
    pub fn sync_config(&self, args: &SyncArgs) -> Result<SyncConfig> {
        let mode = if self.create_k8s_secret {
            SyncMode::Secrets {
                namespace: self.k8s_secret_namespace.clone(),
                custom_label: CustomLabel::from_parts(
                    self.k8s_custom_label_name.as_deref(),
                    self.k8s_custom_label_value.as_deref(),
                ),
            }
        } else {
            let Some(destination) = args.destination.clone() else {
                bail!("LOCAL_DIR is required unless --create-k8s-secret is set");
            };
            SyncMode::Files {
                destination,
                force: self.force_sync,
            }
        };

        Ok(SyncConfig {
            source: args.source.clone(),
            mode,
            include_pattern: non_empty(self.match_regexp.as_deref()).map(String::from),
            exclude_pattern: non_empty(self.filter_out_regexp.as_deref()).map(String::from),
            on_change: self.on_change(),
        })
    }
}

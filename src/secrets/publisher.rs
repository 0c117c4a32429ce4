//! # Secret Publishing
//!
//! Pushes assembled cert/key pairs to a secret store.
//!
//! Incomplete pairs are reported per name and skipped; the first store
//! failure aborts publishing because it is a side effect against a shared
//! resource.

use super::material::{CertKeyPair, SecretMaterial};
use crate::observability::metrics;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info};

/// Result of a single upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("could not publish secret {name}: {source:#}")]
    Upsert {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Secret store the assembled TLS pairs are written to
#[async_trait]
pub trait SecretPublisher: Send + Sync {
    /// Create the secret `name`, or update it when it already exists
    async fn upsert(&self, name: &str, pair: &CertKeyPair) -> anyhow::Result<UpsertOutcome>;
}

/// Outcome of publishing one run's material
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    /// Names skipped because a cert or key was missing, with the missing half
    pub incomplete: Vec<(String, &'static str)>,
}

/// Publish every complete entry of `material`.
///
/// # Errors
///
/// Returns the first upsert failure; entries after it are not attempted.
pub async fn publish(
    publisher: &dyn SecretPublisher,
    material: &SecretMaterial,
) -> Result<PublishReport, PublishError> {
    info!("Start creating {} secrets", material.len());
    let mut report = PublishReport::default();

    for (name, pair) in material.iter() {
        if let Some(missing) = pair.missing_field() {
            error!("{} does not have {} file", name, missing);
            report.incomplete.push((name.to_string(), missing));
            continue;
        }

        match publisher.upsert(name, pair).await {
            Ok(UpsertOutcome::Created) => {
                info!("Secret {} created", name);
                metrics::increment_secrets_published("created");
                report.created.push(name.to_string());
            }
            Ok(UpsertOutcome::Updated) => {
                info!("Secret {} updated", name);
                metrics::increment_secrets_published("updated");
                report.updated.push(name.to_string());
            }
            Err(source) => {
                return Err(PublishError::Upsert {
                    name: name.to_string(),
                    source,
                });
            }
        }
    }

    Ok(report)
}

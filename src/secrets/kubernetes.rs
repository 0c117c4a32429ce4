//! # Kubernetes Secret Publisher
//!
//! Writes TLS pairs as `kubernetes.io/tls` Secrets.
//!
//! Each secret is created first; an `AlreadyExists` (409) response switches
//! to a full replace. This create-then-update sequence is the update path and
//! is kept instead of a server-side apply.

use super::material::CertKeyPair;
use super::publisher::{SecretPublisher, UpsertOutcome};
use crate::config::TuningConfig;
use crate::constants::{APISERVER_RETRY_FACTOR, APISERVER_RETRY_JITTER, CREATED_BY};
use crate::controller::backoff::{retry, ExponentialBackoff};
use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::api::{Api, PostParams};
use kube::Client;
use std::collections::BTreeMap;
use tracing::{debug, info, info_span, Instrument};

const TLS_SECRET_TYPE: &str = "kubernetes.io/tls";
const TLS_CERT_KEY: &str = "tls.crt";
const TLS_PRIVATE_KEY_KEY: &str = "tls.key";

/// Optional extra label put on every published secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomLabel {
    pub name: String,
    pub value: String,
}

impl CustomLabel {
    /// Label from optional name and value; both must be non-empty
    #[must_use]
    pub fn from_parts(name: Option<&str>, value: Option<&str>) -> Option<Self> {
        match (name, value) {
            (Some(name), Some(value)) if !name.is_empty() && !value.is_empty() => Some(Self {
                name: name.to_string(),
                value: value.to_string(),
            }),
            _ => None,
        }
    }
}

/// Publishes TLS secrets into one namespace
pub struct KubeSecretPublisher {
    api: Api<Secret>,
    namespace: String,
    custom_label: Option<CustomLabel>,
}

impl std::fmt::Debug for KubeSecretPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeSecretPublisher")
            .field("namespace", &self.namespace)
            .field("custom_label", &self.custom_label)
            .finish_non_exhaustive()
    }
}

impl KubeSecretPublisher {
    #[must_use]
    pub fn new(client: Client, namespace: &str, custom_label: Option<CustomLabel>) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
            namespace: namespace.to_string(),
            custom_label,
        }
    }

    /// Connect to the API server, retrying until it answers a version request
    pub async fn connect(
        tuning: &TuningConfig,
        namespace: &str,
        custom_label: Option<CustomLabel>,
    ) -> Result<Self> {
        let client = connect_apiserver(tuning).await?;
        Ok(Self::new(client, namespace, custom_label))
    }
}

/// Build a Kubernetes client and wait for the API server to respond.
///
/// Some environments cannot reach the API server on the first request, so
/// the version probe is retried with exponential backoff and jitter.
pub async fn connect_apiserver(tuning: &TuningConfig) -> Result<Client> {
    let backoff = ExponentialBackoff::new(
        tuning.apiserver_retry_steps,
        tuning.apiserver_retry_initial_duration(),
        APISERVER_RETRY_FACTOR,
        APISERVER_RETRY_JITTER,
    );

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let version = retry(backoff, "Kubernetes API server version request", || {
        client.apiserver_version()
    })
    .await
    .context("Kubernetes API server is not reachable")?;

    info!(
        "Connected to Kubernetes API server {}.{} ({})",
        version.major, version.minor, version.git_version
    );
    Ok(client)
}

/// Labels put on a published secret
#[must_use]
pub fn secret_labels(name: &str, custom_label: Option<&CustomLabel>) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::from([
        ("cert_domain".to_string(), name.to_string()),
        ("created_by".to_string(), CREATED_BY.to_string()),
    ]);
    if let Some(label) = custom_label {
        labels.insert(label.name.clone(), label.value.clone());
    }
    labels
}

/// The `kubernetes.io/tls` Secret for one pair
#[must_use]
pub fn build_tls_secret(
    name: &str,
    namespace: &str,
    pair: &CertKeyPair,
    custom_label: Option<&CustomLabel>,
) -> Secret {
    let mut data = BTreeMap::new();
    data.insert(
        TLS_CERT_KEY.to_string(),
        ByteString(pair.cert.clone().unwrap_or_default()),
    );
    data.insert(
        TLS_PRIVATE_KEY_KEY.to_string(),
        ByteString(pair.key.clone().unwrap_or_default()),
    );

    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(secret_labels(name, custom_label)),
            ..ObjectMeta::default()
        },
        data: Some(data),
        type_: Some(TLS_SECRET_TYPE.to_string()),
        ..Secret::default()
    }
}

#[async_trait]
impl SecretPublisher for KubeSecretPublisher {
    async fn upsert(&self, name: &str, pair: &CertKeyPair) -> Result<UpsertOutcome> {
        let span = info_span!(
            "kubernetes.secret.upsert",
            secret.name = name,
            secret.namespace = %self.namespace
        );

        async move {
            let secret = build_tls_secret(name, &self.namespace, pair, self.custom_label.as_ref());

            match self.api.create(&PostParams::default(), &secret).await {
                Ok(_) => Ok(UpsertOutcome::Created),
                Err(kube::Error::Api(api_err)) if api_err.code == 409 => {
                    debug!(
                        "Secret {} already exists in namespace {}, updating",
                        name, self.namespace
                    );
                    self.api
                        .replace(name, &PostParams::default(), &secret)
                        .await
                        .with_context(|| {
                            format!("Failed to update secret {}/{}", self.namespace, name)
                        })?;
                    Ok(UpsertOutcome::Updated)
                }
                Err(e) => Err(anyhow::Error::new(e)
                    .context(format!("Failed to create secret {}/{}", self.namespace, name))),
            }
        }
        .instrument(span)
        .await
    }
}

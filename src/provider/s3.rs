//! # S3 Object Store
//!
//! [`ObjectStore`] backed by the official AWS SDK.
//!
//! Credentials and region come from the default AWS credential chain
//! (environment, profile, IRSA web identity, instance metadata). A custom
//! endpoint switches to path-style addressing for S3-compatible stores such
//! as MinIO.

use super::{ListingPage, ObjectStore, RemoteObject};
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use tracing::{debug, info, info_span, Instrument};

/// S3 client wrapper used by the sync engine
pub struct S3ObjectStore {
    client: Client,
    endpoint: Option<String>,
}

impl std::fmt::Debug for S3ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3ObjectStore")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl S3ObjectStore {
    /// Build a client from the default credential chain.
    ///
    /// `region` overrides the region discovered from the environment and
    /// `endpoint` points the client at an S3-compatible service.
    pub async fn new(region: Option<&str>, endpoint: Option<&str>) -> Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        let sdk_config = loader.load().await;

        let mut s3_config = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint_url) = endpoint {
            info!("Using custom S3 endpoint: {}", endpoint_url);
            s3_config = s3_config.endpoint_url(endpoint_url).force_path_style(true);
        }

        Ok(Self {
            client: Client::from_conf(s3_config.build()),
            endpoint: endpoint.map(ToString::to_string),
        })
    }

    fn to_remote_object(object: &aws_sdk_s3::types::Object) -> Option<RemoteObject> {
        let key = object.key()?.to_string();
        let last_modified = object
            .last_modified()
            .and_then(|ts| {
                let nanos = ts.subsec_nanos();
                DateTime::<Utc>::from_timestamp(ts.secs(), nanos)
            })
            .unwrap_or_default();

        Some(RemoteObject {
            key,
            size: object.size().unwrap_or_default(),
            last_modified,
            e_tag: object.e_tag().unwrap_or_default().to_string(),
        })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<String>,
    ) -> Result<ListingPage> {
        let span = info_span!("s3.list_objects", bucket = bucket, prefix = prefix);

        async move {
            let output = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .set_continuation_token(continuation)
                .send()
                .await
                .with_context(|| format!("Failed to list objects in s3://{bucket}/{prefix}"))?;

            let objects: Vec<RemoteObject> = output
                .contents()
                .iter()
                .filter_map(Self::to_remote_object)
                .collect();

            let next_continuation = if output.is_truncated().unwrap_or(false) {
                output.next_continuation_token().map(ToString::to_string)
            } else {
                None
            };

            debug!(
                "Listed {} objects (more pages: {})",
                objects.len(),
                next_continuation.is_some()
            );

            Ok(ListingPage {
                objects,
                next_continuation,
            })
        }
        .instrument(span)
        .await
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        debug!("Getting s3://{}/{}", bucket, key);

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("Could not get s3 object s3://{bucket}/{key}"))?;

        let body = response
            .body
            .collect()
            .await
            .with_context(|| format!("Could not download s3://{bucket}/{key}"))?;

        Ok(body.into_bytes().to_vec())
    }
}

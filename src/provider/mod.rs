//! # Object Store Providers
//!
//! The sync engine only needs two capabilities from remote storage: a
//! paginated listing under a prefix and whole-object downloads.
//!
//! - [`s3::S3ObjectStore`] implements [`ObjectStore`] on top of the AWS SDK

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub mod s3;

pub use s3::S3ObjectStore;

/// One entry of a bucket listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    /// Full object key, including the prefix
    pub key: String,
    pub size: i64,
    pub last_modified: DateTime<Utc>,
    /// Quoted entity tag as reported by the store
    pub e_tag: String,
}

impl RemoteObject {
    /// Last path component of the key; the name used locally and for secrets
    #[must_use]
    pub fn base_name(&self) -> &str {
        base_name(&self.key)
    }
}

/// Last `/`-separated component of `key`
#[must_use]
pub fn base_name(key: &str) -> &str {
    let trimmed = key.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// A single page of a listing
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    pub objects: Vec<RemoteObject>,
    /// Token for the next page; `None` once the listing is exhausted
    pub next_continuation: Option<String>,
}

/// Read-only access to a remote bucket
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch one page of objects under `prefix`, continuing from `continuation`
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<String>,
    ) -> Result<ListingPage>;

    /// Download the full payload of `key`
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
}

//! # Object Fetcher
//!
//! Downloads one remote object and materializes it as a local file.
//!
//! The payload is written to a temporary file next to the destination and
//! renamed over it, so readers never observe a half-written file. Access and
//! modification times are then set to the object's `last_modified`.

use crate::provider::{ObjectStore, RemoteObject};
use std::fs::{FileTimes, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::{debug, info_span, Instrument};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("could not get s3 object {key}: {source:#}")]
    Download {
        key: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("download of {key} did not finish within {timeout:?}")]
    Timeout { key: String, timeout: Duration },
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not set modification time of {path}: {source}")]
    Timestamp {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Download the full payload of `object`, honouring an optional timeout.
pub async fn download(
    store: &dyn ObjectStore,
    bucket: &str,
    object: &RemoteObject,
    timeout: Option<Duration>,
) -> Result<Vec<u8>, FetchError> {
    let request = store.get_object(bucket, &object.key);
    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, request)
            .await
            .map_err(|_elapsed| FetchError::Timeout {
                key: object.key.clone(),
                timeout: limit,
            })?,
        None => request.await,
    };

    result.map_err(|source| FetchError::Download {
        key: object.key.clone(),
        source,
    })
}

/// Fetch `object` into `destination`, replacing any existing file.
pub async fn fetch_to_file(
    store: &dyn ObjectStore,
    bucket: &str,
    object: &RemoteObject,
    destination: &Path,
    timeout: Option<Duration>,
) -> Result<(), FetchError> {
    let span = info_span!(
        "object.fetch",
        object.key = %object.key,
        object.size = object.size,
        destination = %destination.display()
    );

    async move {
        debug!("Getting {} from {}", object.key, bucket);
        let data = download(store, bucket, object, timeout).await?;

        debug!("Writing file {}", destination.display());
        let path = destination.to_path_buf();
        let modified = SystemTime::from(object.last_modified);
        tokio::task::spawn_blocking(move || materialize(&path, &data, modified))
            .await
            .map_err(|join_err| FetchError::Write {
                path: destination.to_path_buf(),
                source: io::Error::other(join_err),
            })?
    }
    .instrument(span)
    .await
}

/// Atomically write `data` to `destination`, then stamp its times.
fn materialize(destination: &Path, data: &[u8], modified: SystemTime) -> Result<(), FetchError> {
    let write_err = |source: io::Error| FetchError::Write {
        path: destination.to_path_buf(),
        source,
    };

    let parent = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = tempfile::Builder::new()
        .prefix(".s3sync-")
        .tempfile_in(parent)
        .map_err(write_err)?;
    staged.write_all(data).map_err(write_err)?;
    staged.as_file().sync_all().map_err(write_err)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        staged
            .as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o600))
            .map_err(write_err)?;
    }

    staged
        .persist(destination)
        .map_err(|persist_err| write_err(persist_err.error))?;

    // Timestamps go on only after the payload is complete
    let times = FileTimes::new().set_accessed(modified).set_modified(modified);
    OpenOptions::new()
        .write(true)
        .open(destination)
        .and_then(|file| file.set_times(times))
        .map_err(|source| FetchError::Timestamp {
            path: destination.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use crate::provider::ListingPage;

    struct SingleObject {
        payload: Option<Vec<u8>>,
    }

    #[async_trait]
    impl ObjectStore for SingleObject {
        async fn list_page(
            &self,
            _bucket: &str,
            _prefix: &str,
            _continuation: Option<String>,
        ) -> anyhow::Result<ListingPage> {
            Ok(ListingPage::default())
        }

        async fn get_object(&self, _bucket: &str, key: &str) -> anyhow::Result<Vec<u8>> {
            self.payload
                .clone()
                .ok_or_else(|| anyhow!("NoSuchKey: {key}"))
        }
    }

    fn object(key: &str) -> RemoteObject {
        RemoteObject {
            key: key.to_string(),
            size: 5,
            last_modified: Utc.with_ymd_and_hms(2021, 3, 14, 15, 9, 26).unwrap(),
            e_tag: String::new(),
        }
    }

    #[tokio::test]
    async fn test_fetch_writes_payload_and_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("example.com.crt");
        let store = SingleObject {
            payload: Some(b"hello".to_vec()),
        };
        let obj = object("prod/example.com.crt");

        fetch_to_file(&store, "certs", &obj, &destination, None)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&destination).unwrap(), b"hello");
        let mtime = std::fs::metadata(&destination).unwrap().modified().unwrap();
        assert_eq!(mtime, SystemTime::from(obj.last_modified));
    }

    #[tokio::test]
    async fn test_fetch_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("a.txt");
        std::fs::write(&destination, b"stale content").unwrap();
        let store = SingleObject {
            payload: Some(b"fresh".to_vec()),
        };

        fetch_to_file(&store, "certs", &object("a.txt"), &destination, None)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&destination).unwrap(), b"fresh");
        // No staging files are left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_destination_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("a.txt");
        let store = SingleObject { payload: None };

        let err = fetch_to_file(&store, "certs", &object("a.txt"), &destination, None)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Download { .. }));
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn test_fetch_into_missing_directory_is_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("missing").join("a.txt");
        let store = SingleObject {
            payload: Some(b"x".to_vec()),
        };

        let err = fetch_to_file(&store, "certs", &object("a.txt"), &destination, None)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Write { .. }));
    }
}

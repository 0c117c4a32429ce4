//! # Integrity Checking
//!
//! Decides whether a local file still holds the bytes of a remote object by
//! comparing its MD5 digest with the object's ETag.
//!
//! The digest only detects content drift; it is not a security boundary.
//! S3 reports the MD5 of the payload as the ETag for single-part uploads,
//! multipart ETags never match and such objects are always re-fetched.

use crate::constants::DIGEST_CHUNK_SIZE;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum IntegrityError {
    /// The local file does not exist; the expected "needs fetch" outcome
    #[error("{0} does not exist")]
    NotFound(PathBuf),
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl IntegrityError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, IntegrityError::NotFound(_))
    }
}

/// Compare the digest of the file at `path` with a remote fingerprint.
///
/// # Errors
///
/// Returns [`IntegrityError::NotFound`] when the file is missing and
/// [`IntegrityError::Io`] for any other read failure. Callers treat both as
/// "does not match".
pub async fn file_matches(path: &Path, fingerprint: &str) -> Result<bool, IntegrityError> {
    let file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(IntegrityError::NotFound(path.to_path_buf()));
        }
        Err(e) => {
            warn!("Could not open file {}: {}", path.display(), e);
            return Err(IntegrityError::Io {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    reader_matches(file, fingerprint).await.map_err(|e| {
        warn!("Could not calculate md5 sum for file {}: {}", path.display(), e);
        IntegrityError::Io {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

/// Stream `reader` through MD5 and compare against `fingerprint`.
pub async fn reader_matches<R>(reader: R, fingerprint: &str) -> io::Result<bool>
where
    R: AsyncRead + Unpin,
{
    if is_multipart(fingerprint) {
        debug!(
            "ETag {} belongs to a multipart upload and never matches an MD5, fetching again",
            fingerprint
        );
        return Ok(false);
    }
    let digest = md5_hex(reader).await?;
    Ok(digest == normalize_fingerprint(fingerprint))
}

/// Multipart uploads get `<md5 of part digests>-<part count>` as ETag
#[must_use]
pub fn is_multipart(fingerprint: &str) -> bool {
    fingerprint.contains('-')
}

/// Lowercase hex MD5 of everything `reader` yields
pub async fn md5_hex<R>(mut reader: R) -> io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut context = md5::Context::new();
    let mut buf = vec![0u8; DIGEST_CHUNK_SIZE];
    loop {
        let read = reader.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        context.consume(&buf[..read]);
    }
    Ok(format!("{:x}", context.compute()))
}

/// ETags arrive quoted (`"d41d8cd9..."`); strip the quotes before comparing.
#[must_use]
pub fn normalize_fingerprint(fingerprint: &str) -> String {
    fingerprint.replace('"', "").to_ascii_lowercase()
}

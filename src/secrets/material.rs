//! # Secret Material
//!
//! Pairs certificate and key objects into one entry per logical secret name.
//!
//! Objects arrive in listing order, so `example.com.key` may be seen before
//! `example.com.crt` or on a different page. Entries are only complete once
//! both halves have been absorbed.

use crate::constants::{CERT_SUFFIX, KEY_SUFFIX, WILDCARD_MARKER, WILDCARD_PREFIX};
use crate::controller::fetcher::{download, FetchError};
use crate::provider::{ObjectStore, RemoteObject};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Which half of a TLS pair an object holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairField {
    Cert,
    Key,
}

/// Certificate and private key bytes for one logical name
#[derive(Default, Clone, Zeroize, ZeroizeOnDrop)]
pub struct CertKeyPair {
    pub cert: Option<Vec<u8>>,
    pub key: Option<Vec<u8>>,
}

impl std::fmt::Debug for CertKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertKeyPair")
            .field("cert_len", &self.cert.as_ref().map(Vec::len))
            .field("key", &self.key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl CertKeyPair {
    /// Both halves present and non-empty
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.cert.as_ref().is_some_and(|c| !c.is_empty())
            && self.key.as_ref().is_some_and(|k| !k.is_empty())
    }

    /// Name of the first missing half, if any
    #[must_use]
    pub fn missing_field(&self) -> Option<&'static str> {
        if !self.cert.as_ref().is_some_and(|c| !c.is_empty()) {
            Some("cert")
        } else if !self.key.as_ref().is_some_and(|k| !k.is_empty()) {
            Some("key")
        } else {
            None
        }
    }
}

/// Cert/key payloads accumulated during one run, keyed by logical name
#[derive(Debug, Default, Clone)]
pub struct SecretMaterial {
    entries: BTreeMap<String, CertKeyPair>,
}

impl SecretMaterial {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store one half of a pair; a later payload for the same field replaces the earlier one
    pub fn insert(&mut self, name: &str, field: PairField, data: Vec<u8>) {
        let entry = self.entries.entry(name.to_string()).or_default();
        match field {
            PairField::Cert => entry.cert = Some(data),
            PairField::Key => entry.key = Some(data),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CertKeyPair> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CertKeyPair)> {
        self.entries.iter().map(|(name, pair)| (name.as_str(), pair))
    }

    /// Entries with both halves present
    pub fn complete(&self) -> impl Iterator<Item = (&str, &CertKeyPair)> {
        self.iter().filter(|(_, pair)| pair.is_complete())
    }

    /// Names missing a cert or a key, with the missing half
    #[must_use]
    pub fn incomplete(&self) -> Vec<(String, &'static str)> {
        self.iter()
            .filter_map(|(name, pair)| pair.missing_field().map(|f| (name.to_string(), f)))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Derive the logical secret name and pair half from an object's base filename.
///
/// Returns `None` for names without a `.crt`/`.key` suffix or with nothing
/// in front of it. A leading `_`
/// (wildcard certificates such as `_.example.com.crt`) becomes `wildcard`,
/// since secret names may not start with an underscore.
#[must_use]
pub fn classify(filename: &str) -> Option<(String, PairField)> {
    let (stem, field) = if let Some(stem) = filename.strip_suffix(CERT_SUFFIX) {
        (stem, PairField::Cert)
    } else if let Some(stem) = filename.strip_suffix(KEY_SUFFIX) {
        (stem, PairField::Key)
    } else {
        return None;
    };

    let name = match stem.strip_prefix(WILDCARD_MARKER) {
        Some(rest) if rest.trim_start_matches('.').is_empty() => {
            warn!("Ignoring {}: wildcard marker without a domain", filename);
            return None;
        }
        Some(rest) => format!("{WILDCARD_PREFIX}{rest}"),
        None if stem.is_empty() => {
            warn!("Ignoring {}: no secret name before the suffix", filename);
            return None;
        }
        None => stem.to_string(),
    };
    Some((name, field))
}

/// Fetch `object` into `material` under the name derived from `filename`.
///
/// Objects that are neither certificates nor keys are ignored without being
/// downloaded.
pub async fn absorb(
    store: &dyn ObjectStore,
    bucket: &str,
    object: &RemoteObject,
    filename: &str,
    material: &Mutex<SecretMaterial>,
    timeout: Option<Duration>,
) -> Result<bool, FetchError> {
    let Some((name, field)) = classify(filename) else {
        debug!("Ignoring {}: not a certificate or key", object.key);
        return Ok(false);
    };

    let data = download(store, bucket, object, timeout).await?;
    debug!("Absorbed {:?} for secret {}", field, name);

    material
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .insert(&name, field, data);
    Ok(true)
}

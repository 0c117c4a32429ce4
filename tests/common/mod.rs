//! Common test utilities for sync integration tests
//!
//! In-memory stand-ins for the remote store, the secret store and the change
//! notifier, plus helpers to build listings.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use s3sync::notifier::ChangeNotifier;
use s3sync::provider::{ListingPage, ObjectStore, RemoteObject};
use s3sync::secrets::{CertKeyPair, SecretPublisher, UpsertOutcome};
use std::collections::{HashMap, HashSet};
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const BUCKET: &str = "certs";

/// Fixed modification time used by listings
pub fn t1() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

/// Quoted MD5 ETag of `payload`, as S3 reports it for single-part uploads
pub fn etag_of(payload: &[u8]) -> String {
    format!("\"{:x}\"", md5::compute(payload))
}

/// Remote object whose ETag matches `payload`
pub fn object(key: &str, payload: &[u8]) -> RemoteObject {
    RemoteObject {
        key: key.to_string(),
        size: i64::try_from(payload.len()).unwrap(),
        last_modified: t1(),
        e_tag: etag_of(payload),
    }
}

/// One entry of a [`MemoryStore`] listing
#[derive(Clone)]
pub struct Entry {
    pub object: RemoteObject,
    pub payload: Vec<u8>,
}

/// Paginated in-memory bucket
#[derive(Default)]
pub struct MemoryStore {
    pages: Vec<Vec<Entry>>,
    failing_gets: HashSet<String>,
    failing_page: Option<usize>,
    get_delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    /// `list:<n>` and `got:<key>` in the order they happened
    pub events: Mutex<Vec<String>>,
}

impl MemoryStore {
    /// Single page listing of `(key, payload)` pairs
    pub fn with_objects(objects: &[(&str, &[u8])]) -> Self {
        Self::with_pages(&[objects])
    }

    pub fn with_pages(pages: &[&[(&str, &[u8])]]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|page| {
                    page.iter()
                        .map(|(key, payload)| Entry {
                            object: object(key, payload),
                            payload: payload.to_vec(),
                        })
                        .collect()
                })
                .collect(),
            ..Self::default()
        }
    }

    /// Downloads of `key` fail
    pub fn failing_get(mut self, key: &str) -> Self {
        self.failing_gets.insert(key.to_string());
        self
    }

    /// Listing page `page` (1-based) fails
    pub fn failing_page(mut self, page: usize) -> Self {
        self.failing_page = Some(page);
        self
    }

    /// Every download sleeps before answering
    pub fn slow_gets(mut self, delay: Duration) -> Self {
        self.get_delay = Some(delay);
        self
    }

    /// Highest number of downloads that were running at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn downloads(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| e.strip_prefix("got:").map(String::from))
            .collect()
    }

    fn find(&self, key: &str) -> Option<&Entry> {
        self.pages.iter().flatten().find(|e| e.object.key == key)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<String>,
    ) -> Result<ListingPage> {
        assert_eq!(bucket, BUCKET);
        let index = match continuation {
            Some(token) => token.parse::<usize>()?,
            None => 0,
        };
        self.events
            .lock()
            .unwrap()
            .push(format!("list:{}", index + 1));

        if self.failing_page == Some(index + 1) {
            return Err(anyhow!("listing page {} failed", index + 1));
        }

        let objects = self
            .pages
            .get(index)
            .map(|page| {
                page.iter()
                    .filter(|e| e.object.key.starts_with(prefix))
                    .map(|e| e.object.clone())
                    .collect()
            })
            .unwrap_or_default();
        let next_continuation = (index + 1 < self.pages.len()).then(|| (index + 1).to_string());

        Ok(ListingPage {
            objects,
            next_continuation,
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        assert_eq!(bucket, BUCKET);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(delay) = self.get_delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.failing_gets.contains(key) {
            return Err(anyhow!("access denied for {key}"));
        }
        let entry = self
            .find(key)
            .ok_or_else(|| anyhow!("no such key {key}"))?;
        self.events.lock().unwrap().push(format!("got:{key}"));
        Ok(entry.payload.clone())
    }
}

/// Secret store that keeps upserted pairs in memory
#[derive(Default)]
pub struct RecordingPublisher {
    existing: HashSet<String>,
    fail_on: Option<String>,
    pub secrets: Mutex<HashMap<String, (Vec<u8>, Vec<u8>)>>,
}

impl RecordingPublisher {
    pub fn with_existing(names: &[&str]) -> Self {
        Self {
            existing: names.iter().map(|n| (*n).to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn failing_on(name: &str) -> Self {
        Self {
            fail_on: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn get(&self, name: &str) -> Option<(Vec<u8>, Vec<u8>)> {
        self.secrets.lock().unwrap().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.secrets.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl SecretPublisher for RecordingPublisher {
    async fn upsert(&self, name: &str, pair: &CertKeyPair) -> Result<UpsertOutcome> {
        if self.fail_on.as_deref() == Some(name) {
            return Err(anyhow!("secrets \"{name}\" is forbidden"));
        }
        let cert = pair.cert.clone().ok_or_else(|| anyhow!("missing cert"))?;
        let key = pair.key.clone().ok_or_else(|| anyhow!("missing key"))?;
        self.secrets
            .lock()
            .unwrap()
            .insert(name.to_string(), (cert, key));

        Ok(if self.existing.contains(name) {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Created
        })
    }
}

/// Notifier that records actions instead of running them
#[derive(Default)]
pub struct RecordingNotifier {
    exit_code: i32,
    pub actions: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn exiting_with(code: i32) -> Self {
        Self {
            exit_code: code,
            ..Self::default()
        }
    }

    pub fn actions(&self) -> Vec<String> {
        self.actions.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChangeNotifier for RecordingNotifier {
    async fn notify(&self, action: &str) -> Result<ExitStatus> {
        self.actions.lock().unwrap().push(action.to_string());
        // Raw wait status: exit code lives in the second byte
        Ok(ExitStatus::from_raw(self.exit_code << 8))
    }
}

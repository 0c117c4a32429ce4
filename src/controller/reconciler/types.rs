//! # Types
//!
//! Outcome and error types of a sync run.

use crate::controller::address::AddressError;
use crate::secrets::publisher::{PublishError, PublishReport};
use std::path::PathBuf;
use thiserror::Error;

/// Terminal failures; everything else is recorded in [`SyncReport::failures`]
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error("destination directory {path} is not usable: {source}")]
    Destination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("secret mode requires a secret publisher")]
    PublisherMissing,
    #[error("listing failed on page {page}: {source:#}")]
    Listing {
        page: usize,
        #[source]
        source: anyhow::Error,
    },
    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Operation a per-object failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Downloading or writing a file
    Fetch,
    /// Downloading a cert/key into memory
    Absorb,
    /// Removing an unlisted local file
    Delete,
}

impl FailureKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Fetch => "fetch",
            FailureKind::Absorb => "absorb",
            FailureKind::Delete => "delete",
        }
    }
}

/// A per-object failure that did not stop the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectFailure {
    /// Object key, or local file name for deletions
    pub key: String,
    pub kind: FailureKind,
    pub message: String,
}

/// What one unit of work did with its object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnitOutcome {
    /// Local copy already matches
    Unchanged,
    /// Written to the destination directory
    Fetched,
    /// Pulled into the secret material
    Absorbed,
    /// Not a certificate or key
    Ignored,
}

/// Aggregated outcome of one sync run
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Listing pages consumed
    pub pages: usize,
    /// Objects that passed the filters
    pub listed: usize,
    /// Objects skipped by the include/exclude patterns
    pub filtered_out: usize,
    pub unchanged: usize,
    pub fetched: usize,
    pub absorbed: usize,
    /// Secret-mode objects that are neither certificates nor keys
    pub ignored: usize,
    /// Local file names removed by force mode
    pub deleted: Vec<String>,
    pub failures: Vec<ObjectFailure>,
    /// Secret-mode publishing outcome
    pub published: Option<PublishReport>,
    /// Whether any fetch or deletion was dispatched
    pub action_required: bool,
    /// Whether the change action ran and exited successfully, if it ran at all
    pub notified: Option<bool>,
}

impl SyncReport {
    /// Failures of one kind
    #[must_use]
    pub fn failure_count(&self, kind: FailureKind) -> usize {
        self.failures.iter().filter(|f| f.kind == kind).count()
    }

    pub(crate) fn record(&mut self, outcome: UnitOutcome) {
        match outcome {
            UnitOutcome::Unchanged => self.unchanged += 1,
            UnitOutcome::Fetched => self.fetched += 1,
            UnitOutcome::Absorbed => self.absorbed += 1,
            UnitOutcome::Ignored => self.ignored += 1,
        }
    }
}

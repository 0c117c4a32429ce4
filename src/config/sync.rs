//! # Sync Configuration
//!
//! Everything one sync run needs to know, independent of how it was supplied.

use crate::secrets::kubernetes::CustomLabel;
use std::path::PathBuf;

/// Where fetched objects end up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncMode {
    /// Mirror objects into a local directory
    Files {
        destination: PathBuf,
        /// Delete local files that are no longer listed remotely
        force: bool,
    },
    /// Pair `.crt`/`.key` objects into TLS secrets
    Secrets {
        namespace: String,
        custom_label: Option<CustomLabel>,
    },
}

impl SyncMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::Files { .. } => "files",
            SyncMode::Secrets { .. } => "secrets",
        }
    }
}

/// Configuration of one sync run
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Source location, `s3://bucket/prefix` or `bucket/prefix`
    pub source: String,
    pub mode: SyncMode,
    /// Only objects whose key matches are synced
    pub include_pattern: Option<String>,
    /// Objects whose key matches are skipped, even if included
    pub exclude_pattern: Option<String>,
    /// Shell command run once after any change
    pub on_change: Option<String>,
}

impl SyncConfig {
    /// File-mode configuration with no filters or hook
    #[must_use]
    pub fn files(source: &str, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.to_string(),
            mode: SyncMode::Files {
                destination: destination.into(),
                force: false,
            },
            include_pattern: None,
            exclude_pattern: None,
            on_change: None,
        }
    }

    /// Secret-mode configuration with no filters or hook
    #[must_use]
    pub fn secrets(source: &str, namespace: &str) -> Self {
        Self {
            source: source.to_string(),
            mode: SyncMode::Secrets {
                namespace: namespace.to_string(),
                custom_label: None,
            },
            include_pattern: None,
            exclude_pattern: None,
            on_change: None,
        }
    }

    #[must_use]
    pub fn with_force(mut self, enabled: bool) -> Self {
        if let SyncMode::Files { force, .. } = &mut self.mode {
            *force = enabled;
        }
        self
    }

    #[must_use]
    pub fn with_include(mut self, pattern: &str) -> Self {
        self.include_pattern = Some(pattern.to_string());
        self
    }

    #[must_use]
    pub fn with_exclude(mut self, pattern: &str) -> Self {
        self.exclude_pattern = Some(pattern.to_string());
        self
    }

    #[must_use]
    pub fn with_on_change(mut self, action: &str) -> Self {
        self.on_change = Some(action.to_string());
        self
    }
}

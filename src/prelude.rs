//! # Prelude
//!
//! Re-exports commonly used types and traits.
//!
//! ```rust
//! use s3sync::prelude::*;
//! ```

// Configuration
pub use crate::config::{SyncConfig, SyncMode, TuningConfig};

// Sync engine
pub use crate::controller::address::{parse_address, Address, AddressError};
pub use crate::controller::reconciler::{
    FailureKind, ObjectFailure, Reconciler, SyncError, SyncReport,
};

// Collaborator traits and their default implementations
pub use crate::notifier::{ChangeNotifier, ShellNotifier};
pub use crate::provider::{ListingPage, ObjectStore, RemoteObject, S3ObjectStore};
pub use crate::secrets::{
    CertKeyPair, CustomLabel, KubeSecretPublisher, PublishReport, SecretMaterial,
    SecretPublisher, UpsertOutcome,
};

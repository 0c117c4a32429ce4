//! # Reconciler
//!
//! Drives one sync run from a remote prefix into a local directory or a set
//! of TLS secrets.
//!
//! ## Reconciliation Flow
//!
//! 1. Parse the source address
//! 2. List the prefix page by page, filtering keys by include/exclude patterns
//! 3. Per page, concurrently:
//!    - **File Mode**: verify local digests and fetch missing or changed files
//!    - **Secret Mode**: absorb certificates and keys into memory
//! 4. Remove unlisted local files when forced
//! 5. Publish complete certificate/key pairs
//! 6. Run the change action if anything changed

pub mod filter;
pub mod prune;
pub mod reconcile;
pub mod types;

pub use filter::{FilterVerdict, KeyFilter};
pub use reconcile::Reconciler;
pub use types::{FailureKind, ObjectFailure, SyncError, SyncReport};

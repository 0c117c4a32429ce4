//! # Constants
//!
//! Shared constants used throughout the sync engine.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// URI scheme accepted (and implied) for source locations
pub const S3_SCHEME: &str = "s3";

/// Filename suffix of certificate objects absorbed in secret mode
pub const CERT_SUFFIX: &str = ".crt";

/// Filename suffix of private key objects absorbed in secret mode
pub const KEY_SUFFIX: &str = ".key";

/// Leading marker of wildcard-domain certificate filenames (`_.example.com.crt`)
pub const WILDCARD_MARKER: &str = "_";

/// Replacement for [`WILDCARD_MARKER`]; secret names may not start with `_`
pub const WILDCARD_PREFIX: &str = "wildcard";

/// Namespace used for published secrets when none is configured
pub const DEFAULT_SECRET_NAMESPACE: &str = "default";

/// Value of the `created_by` label put on every published secret
pub const CREATED_BY: &str = "s3sync";

/// Shell used to run the post-sync action
pub const NOTIFIER_SHELL: &str = "/bin/sh";

/// Chunk size used when streaming local files through the digest
pub const DIGEST_CHUNK_SIZE: usize = 64 * 1024;

/// Default per-fetch timeout (seconds); zero disables it
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 0;

/// Default bound on in-flight fetches within one page; zero means the page size
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 0;

/// Default number of attempts when connecting to the Kubernetes API server
pub const DEFAULT_APISERVER_RETRY_STEPS: u32 = 10;

/// Default initial delay between API server connection attempts (milliseconds)
pub const DEFAULT_APISERVER_RETRY_INITIAL_MS: u64 = 1000;

/// Growth factor applied to the API server retry delay after each attempt
pub const APISERVER_RETRY_FACTOR: f64 = 1.5;

/// Fraction of the current delay added as random jitter
pub const APISERVER_RETRY_JITTER: f64 = 0.1;

//! # Tuning Configuration
//!
//! Operational knobs loaded from environment variables.

use std::time::Duration;

/// Settings that rarely change between runs
///
/// All settings have sensible defaults and can be overridden via environment variables.
#[derive(Debug, Clone)]
pub struct TuningConfig {
    /// Per-fetch download timeout (seconds); zero disables it
    pub fetch_timeout_secs: u64,
    /// Maximum in-flight fetches within one listing page; zero means unbounded
    pub max_concurrent_fetches: usize,
    /// Attempts made when connecting to the Kubernetes API server
    pub apiserver_retry_steps: u32,
    /// Initial delay between API server connection attempts (milliseconds)
    pub apiserver_retry_initial_ms: u64,
}

impl Default for TuningConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            apiserver_retry_steps: DEFAULT_APISERVER_RETRY_STEPS,
            apiserver_retry_initial_ms: DEFAULT_APISERVER_RETRY_INITIAL_MS,
        }
    }
}

impl TuningConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        use crate::constants::*;
        Self {
            fetch_timeout_secs: env_var_or_default(
                "FETCH_TIMEOUT_SECS",
                DEFAULT_FETCH_TIMEOUT_SECS,
            ),
            max_concurrent_fetches: env_var_or_default(
                "MAX_CONCURRENT_FETCHES",
                DEFAULT_MAX_CONCURRENT_FETCHES,
            ),
            apiserver_retry_steps: env_var_or_default(
                "APISERVER_RETRY_STEPS",
                DEFAULT_APISERVER_RETRY_STEPS,
            ),
            apiserver_retry_initial_ms: env_var_or_default(
                "APISERVER_RETRY_INITIAL_MS",
                DEFAULT_APISERVER_RETRY_INITIAL_MS,
            ),
        }
    }

    /// Per-fetch timeout, if enabled
    #[must_use]
    pub fn fetch_timeout(&self) -> Option<Duration> {
        (self.fetch_timeout_secs > 0).then(|| Duration::from_secs(self.fetch_timeout_secs))
    }

    /// Bound on in-flight fetches per page, if any
    #[must_use]
    pub fn fetch_concurrency(&self) -> Option<usize> {
        (self.max_concurrent_fetches > 0).then_some(self.max_concurrent_fetches)
    }

    /// Get initial API server retry delay
    #[must_use]
    pub fn apiserver_retry_initial_duration(&self) -> Duration {
        Duration::from_millis(self.apiserver_retry_initial_ms)
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Interpret a flag value the way the environment usually spells it
#[must_use]
pub fn parse_bool_flag(value: &str) -> bool {
    let v_lower = value.trim().to_lowercase();
    v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
}

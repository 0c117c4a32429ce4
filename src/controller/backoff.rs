//! # Exponential Backoff
//!
//! Bounded exponential backoff with jitter, used while waiting for the
//! Kubernetes API server to become reachable. Some environments cannot reach
//! the API server on the very first request, so connection setup is retried a
//! fixed number of times before giving up.
//!
//! ## Usage
//!
//! ```rust
//! use s3sync::controller::backoff::ExponentialBackoff;
//! use std::time::Duration;
//!
//! let mut backoff = ExponentialBackoff::new(3, Duration::from_secs(1), 1.5, 0.0);
//! assert_eq!(backoff.next_delay(), Some(Duration::from_millis(1000)));
//! assert_eq!(backoff.next_delay(), Some(Duration::from_millis(1500)));
//! assert_eq!(backoff.next_delay(), None);
//! ```

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Exponential backoff calculator
///
/// Produces `steps - 1` delays between `steps` attempts. Each delay is the
/// previous base delay times `factor`, plus up to `jitter * base` of random
/// extra wait.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// Remaining attempts, including the one about to be made
    steps: u32,
    /// Base delay before jitter
    current: Duration,
    factor: f64,
    jitter: f64,
}

impl ExponentialBackoff {
    #[must_use]
    pub fn new(steps: u32, initial: Duration, factor: f64, jitter: f64) -> Self {
        Self {
            steps,
            current: initial,
            factor,
            jitter,
        }
    }

    /// Delay to wait after a failed attempt, or `None` once attempts are exhausted
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.steps <= 1 {
            self.steps = 0;
            return None;
        }
        self.steps -= 1;

        let base = self.current;
        self.current = base.mul_f64(self.factor);

        if self.jitter > 0.0 {
            let extra = rand::rng().random_range(0.0..=self.jitter);
            Some(base + base.mul_f64(extra))
        } else {
            Some(base)
        }
    }
}

/// Run `operation` until it succeeds or `backoff` is exhausted.
///
/// # Errors
///
/// Returns the error of the last attempt when every attempt failed.
pub async fn retry<T, E, F, Fut>(
    mut backoff: ExponentialBackoff,
    what: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt: u32 = 1;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!("{} succeeded after {} attempts", what, attempt);
                }
                return Ok(value);
            }
            Err(e) => match backoff.next_delay() {
                Some(delay) => {
                    warn!(
                        "{} failed (attempt {}): {}; retrying in {:?}",
                        what, attempt, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => {
                    warn!("{} failed after {} attempts: {}", what, attempt, e);
                    return Err(e);
                }
            },
        }
    }
}

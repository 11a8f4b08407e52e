//! Bounded retry with randomized jitter.
//!
//! Storage backends with automatic reconnection surface transient
//! connectivity errors that usually resolve within a reconnect cycle.
//! [`retry_transient`] retries an operation for exactly that error class,
//! up to a bounded attempt count, sleeping a randomized interval between
//! attempts. Validation and logic errors are never retried.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

/// Classifies errors that may succeed on retry.
pub trait Transient {
    /// Returns true if this error indicates a transient condition
    /// (connection dropped, reconnect in progress) worth retrying.
    fn is_transient(&self) -> bool;
}

/// Retry parameters: attempt bound and jitter window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Lower bound of the randomized wait between attempts.
    pub wait_min: Duration,
    /// Upper bound of the randomized wait between attempts.
    pub wait_max: Duration,
}

impl RetryPolicy {
    /// Creates a new policy.
    pub fn new(max_attempts: u32, wait_min: Duration, wait_max: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            wait_min,
            wait_max,
        }
    }

    /// Picks a wait interval uniformly from the jitter window.
    fn jitter(&self) -> Duration {
        let min = self.wait_min.as_millis() as u64;
        let max = self.wait_max.as_millis() as u64;
        if max > min {
            Duration::from_millis(rand::thread_rng().gen_range(min..=max))
        } else {
            self.wait_min
        }
    }
}

impl Default for RetryPolicy {
    /// 3 attempts with a fixed 1 second wait between them.
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1), Duration::from_secs(1))
    }
}

/// Runs `op`, retrying transient failures according to `policy`.
///
/// Returns the first success, the first non-transient error, or the last
/// transient error once the attempt bound is exhausted.
pub async fn retry_transient<T, E, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, E>
where
    E: Transient + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                let wait = policy.jitter();
                warn!(
                    attempt,
                    wait_ms = wait.as_millis() as u64,
                    error = %err,
                    "transient failure, retrying"
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

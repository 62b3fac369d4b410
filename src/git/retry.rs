//! git::retry
//!
//! Bounded retry with a fixed backoff for transport operations.
//!
//! Hosted providers sometimes report a freshly created repository as missing
//! for a few seconds, so clone and push retry on
//! [`GitError::RemoteNotFound`]. Every other error is returned after the first
//! attempt. Cancellation is checked before each attempt and interrupts the
//! backoff sleep.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::error::GitError;

/// Retry settings for clone and push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one (>= 1)
    pub attempts: u32,
    /// Delay between attempts
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_secs(3),
        }
    }
}

impl RetryPolicy {
    /// Create a policy; `attempts` is clamped to at least one.
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            backoff,
        }
    }

    /// A policy that never retries.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// attempts are exhausted. The last error is returned on exhaustion.
pub async fn with_retry<T, F>(
    policy: RetryPolicy,
    cancel: &CancellationToken,
    what: &str,
    mut op: F,
) -> Result<T, GitError>
where
    F: FnMut() -> Result<T, GitError>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        if cancel.is_cancelled() {
            return Err(GitError::Cancelled);
        }

        match op() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < attempts => {
                warn!(
                    attempt,
                    attempts,
                    backoff = ?policy.backoff,
                    "{what} failed: {err}, retrying"
                );
                tokio::select! {
                    _ = cancel.cancelled() => return Err(GitError::Cancelled),
                    _ = tokio::time::sleep(policy.backoff) => {}
                }
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

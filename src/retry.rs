//! Retry policy for transient ARM failures.
//!
//! Every API client carries a [`RetryConfig`]. A request is retried when the
//! transport fails to connect or times out, or when ARM answers with a
//! throttling (429) or server-side (5xx, except 501) status. The wait between
//! attempts grows exponentially from `wait_min` and never exceeds `wait_max`.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;

/// Default minimum wait between retries.
pub const DEFAULT_RETRY_INTERVAL_MIN: Duration = Duration::from_secs(1);

/// Default maximum wait between retries.
pub const DEFAULT_RETRY_INTERVAL_MAX: Duration = Duration::from_secs(60);

/// Default number of retries after the first attempt.
pub const DEFAULT_RETRY_MAX: u32 = 40;

/// Backoff and attempt-count policy applied to every request.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use azure_aci::RetryConfig;
///
/// let retry = RetryConfig::new(Duration::from_millis(100), Duration::from_secs(1), 3);
/// assert_eq!(retry.backoff(0, None), Duration::from_millis(100));
/// assert_eq!(retry.backoff(2, None), Duration::from_millis(400));
/// assert_eq!(retry.backoff(10, None), Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RetryConfig {
    /// Wait before the first retry.
    pub wait_min: Duration,
    /// Upper bound for any single wait.
    pub wait_max: Duration,
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            wait_min: DEFAULT_RETRY_INTERVAL_MIN,
            wait_max: DEFAULT_RETRY_INTERVAL_MAX,
            max_retries: DEFAULT_RETRY_MAX,
        }
    }
}

impl RetryConfig {
    pub const fn new(wait_min: Duration, wait_max: Duration, max_retries: u32) -> Self {
        Self {
            wait_min,
            wait_max,
            max_retries,
        }
    }

    /// A policy that never retries.
    pub const fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO, 0)
    }

    /// Returns `true` if another attempt is allowed after `attempt` retries.
    pub fn can_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// Computes the wait before retry number `attempt` (0-based).
    ///
    /// A server-provided `Retry-After` replaces the exponential value but is
    /// still capped at `wait_max`.
    pub fn backoff(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let wait = match retry_after {
            Some(wait) => wait,
            None => {
                let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
                self.wait_min.saturating_mul(factor)
            }
        };
        wait.min(self.wait_max)
    }

    /// Returns `true` for statuses worth another attempt.
    pub fn should_retry_status(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS
            || (status.is_server_error() && status != StatusCode::NOT_IMPLEMENTED)
    }

    /// Returns `true` for transport errors worth another attempt.
    pub fn should_retry_error(err: &reqwest::Error) -> bool {
        err.is_connect() || err.is_timeout()
    }
}

/// Reads an integer-seconds `Retry-After` header on 429/503 responses.
pub(crate) fn retry_after(status: StatusCode, headers: &HeaderMap) -> Option<Duration> {
    if status != StatusCode::TOO_MANY_REQUESTS && status != StatusCode::SERVICE_UNAVAILABLE {
        return None;
    }
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

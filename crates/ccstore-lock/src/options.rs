//! Lock acquisition tuning.

use std::time::Duration;

/// Floor for the retry delay, so a zero `min_backoff` cannot spin.
const MIN_RETRY_DELAY: Duration = Duration::from_millis(1);

/// How long and how often [`LockFile::acquire`](crate::LockFile::acquire)
/// retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockOptions {
    /// Total time to wait before giving up. Zero means a single attempt.
    pub timeout: Duration,
    /// Delay before the first retry. Doubles after each retry.
    pub min_backoff: Duration,
    /// Upper bound on the retry delay.
    pub max_backoff: Duration,
    /// Waiting longer than this logs a contention warning.
    pub contention_warning: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            min_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(100),
            contention_warning: Duration::from_millis(500),
        }
    }
}

impl LockOptions {
    /// Options that wait at most `timeout`, with default backoff.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// The delay that follows `current`. Never below 1 ms, unless
    /// `max_backoff` is.
    pub(crate) fn next_backoff(&self, current: Duration) -> Duration {
        current
            .saturating_mul(2)
            .max(MIN_RETRY_DELAY)
            .min(self.max_backoff)
    }
}

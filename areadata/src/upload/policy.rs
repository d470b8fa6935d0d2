//! Retry policy for part transfers.
//!
//! Each part is retried independently against the same partition plan. Only
//! transient failures (see [`UploadError::is_transient`]) are retried; the
//! delay grows exponentially between attempts up to a cap.

use std::thread;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::error::UploadError;

/// Default number of attempts per part (including the first).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;

/// Default delay before the first retry (500ms).
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 500;

/// Default maximum delay between retries (30 seconds).
pub const DEFAULT_MAX_DELAY_SECS: u64 = 30;

/// Default multiplier applied to the delay after each failure.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Granularity at which a backoff sleep notices cancellation.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Bounded exponential backoff.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    pub max_attempts: u32,
    /// Delay after the first failure.
    pub initial_delay: Duration,
    /// Delay cap.
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each failure.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(DEFAULT_MAX_ATTEMPTS)
    }
}

impl RetryPolicy {
    /// Exponential backoff with the default delays.
    pub fn exponential(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            max_delay: Duration::from_secs(DEFAULT_MAX_DELAY_SECS),
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }

    /// A single attempt, never retried.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Override the initial delay (tests use zero).
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Delay to wait after `failed_attempts` failures, or `None` once the
    /// budget is spent.
    pub fn delay_after(&self, failed_attempts: u32) -> Option<Duration> {
        if failed_attempts == 0 || failed_attempts >= self.max_attempts {
            return None;
        }
        let factor = self.multiplier.powi(failed_attempts as i32 - 1);
        let delay_ms = (self.initial_delay.as_millis() as f64 * factor)
            .min(self.max_delay.as_millis() as f64);
        Some(Duration::from_millis(delay_ms as u64))
    }

    /// Decide whether `error` after `failed_attempts` failures deserves
    /// another attempt, returning the delay if so.
    pub fn retry_delay(&self, error: &UploadError, failed_attempts: u32) -> Option<Duration> {
        if !error.is_transient() {
            return None;
        }
        self.delay_after(failed_attempts)
    }
}

/// Sleep for `delay`, waking early if `cancel` fires.
///
/// Returns `false` when the sleep was cut short by cancellation.
pub fn backoff_sleep(delay: Duration, cancel: &CancellationToken) -> bool {
    let deadline = Instant::now() + delay;
    loop {
        if cancel.is_cancelled() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep((deadline - now).min(CANCEL_POLL_INTERVAL));
    }
}

//! Retry fabric (§4.3 C3): exponential backoff with jitter, and per-operation
//! failure tracking.
//!
//! Grounded in `original_source/core/retry_handler.py`: `ExponentialBackoff`
//! becomes [`Backoff`], `RetryContext`/`RetryHandler` become [`RetryFabric`]. The
//! source's `execute_with_retry` loop (attempt, sleep, retry) is not carried over
//! verbatim — callers here own their own retry loop and call [`RetryFabric::note_failure`]
//! / [`RetryFabric::note_success`] to keep the shared bookkeeping current, because the
//! source's single global `retry_handler` sleeping on every caller's behalf does not
//! fit a scheduler where dozens of feeds retry independently and concurrently.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use syncd_core::SyncError;

/// Exponential backoff with ±25% jitter, capped at `max_delay`.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    base_delay_secs: f64,
    max_delay_secs: f64,
}

impl Backoff {
    #[must_use]
    pub const fn new(base_delay_secs: f64) -> Self {
        Self {
            base_delay_secs,
            max_delay_secs: 300.0,
        }
    }

    /// Delay before retry attempt `attempt` (0-based: the delay before the first
    /// retry, i.e. after the first failure, is `attempt = 0`).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let raw = self.base_delay_secs * 2f64.powi(attempt.min(20) as i32);
        let capped = raw.min(self.max_delay_secs);

        let jitter_range = capped * 0.25;
        let jittered = capped + rand::rng().random_range(-jitter_range..=jitter_range);

        Duration::from_secs_f64(jittered.max(0.0))
    }
}

/// Per-operation retry bookkeeping: attempts, consecutive failures, and the last
/// outcome, keyed by an opaque operation id (e.g. a feed id or calendar id).
#[derive(Debug, Clone, Default)]
struct RetryContext {
    attempts: u32,
    consecutive_failures: u32,
    last_attempt: Option<DateTime<Utc>>,
    last_success: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

/// Tracks retry state for many concurrently-retrying operations and decides
/// whether a given failure should be retried.
pub struct RetryFabric {
    backoff: Backoff,
    max_retries: u32,
    contexts: Mutex<HashMap<String, RetryContext>>,
}

impl RetryFabric {
    #[must_use]
    pub fn new(base_delay_secs: f64, max_retries: u32) -> Self {
        Self {
            backoff: Backoff::new(base_delay_secs),
            max_retries,
            contexts: Mutex::new(HashMap::new()),
        }
    }

    /// Whether `operation_id`'s next attempt should happen at all: the error must
    /// be retryable (§7 `SyncError::is_retryable`) and the attempt budget not yet
    /// exhausted.
    pub fn should_retry(&self, operation_id: &str, err: &SyncError) -> bool {
        if !err.is_retryable() {
            return false;
        }
        let contexts = self.contexts.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let attempts = contexts.get(operation_id).map_or(0, |ctx| ctx.attempts);
        attempts < self.max_retries
    }

    /// Delay to wait before the next attempt, based on `operation_id`'s current
    /// attempt count.
    pub fn next_delay(&self, operation_id: &str) -> Duration {
        let contexts = self.contexts.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let attempts = contexts.get(operation_id).map_or(0, |ctx| ctx.attempts);
        self.backoff.delay_for(attempts)
    }

    pub fn note_failure(&self, operation_id: &str, err: &SyncError, now: DateTime<Utc>) {
        let mut contexts = self.contexts.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let ctx = contexts.entry(operation_id.to_string()).or_default();
        ctx.attempts += 1;
        ctx.consecutive_failures += 1;
        ctx.last_attempt = Some(now);
        ctx.last_error = Some(err.to_string());
    }

    pub fn note_success(&self, operation_id: &str, now: DateTime<Utc>) {
        let mut contexts = self.contexts.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let ctx = contexts.entry(operation_id.to_string()).or_default();
        ctx.attempts = 0;
        ctx.consecutive_failures = 0;
        ctx.last_success = Some(now);
        ctx.last_error = None;
    }

    #[must_use]
    pub fn consecutive_failures(&self, operation_id: &str) -> u32 {
        let contexts = self.contexts.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        contexts.get(operation_id).map_or(0, |ctx| ctx.consecutive_failures)
    }

    /// Drop any context whose last attempt is older than 24 hours, mirroring the
    /// source's hourly `_periodic_cleanup`. Piggybacked on the feed-poll driver's
    /// own tick rather than a dedicated task (SPEC_FULL §4.3 note).
    pub fn cleanup_older_than(&self, cutoff: DateTime<Utc>) {
        let mut contexts = self.contexts.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        contexts.retain(|_, ctx| ctx.last_attempt.is_none_or(|last| last > cutoff));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_exponentially_and_caps() {
        let backoff = Backoff::new(2.0);
        assert!(backoff.delay_for(0).as_secs_f64() <= 2.5);
        assert!(backoff.delay_for(10).as_secs_f64() <= 300.0 * 1.25);
    }

    #[test]
    fn fabric_stops_retrying_past_max_attempts() {
        let fabric = RetryFabric::new(1.0, 2);
        let now = Utc::now();
        let err = SyncError::Transient("boom".into());
        assert!(fabric.should_retry("feed-1", &err));
        fabric.note_failure("feed-1", &err, now);
        fabric.note_failure("feed-1", &err, now);
        assert!(!fabric.should_retry("feed-1", &err));
    }

    #[test]
    fn fabric_never_retries_permanent_errors() {
        let fabric = RetryFabric::new(1.0, 5);
        let err = SyncError::PermanentSource("404".into());
        assert!(!fabric.should_retry("feed-1", &err));
    }

    #[test]
    fn success_resets_the_attempt_counter() {
        let fabric = RetryFabric::new(1.0, 2);
        let now = Utc::now();
        let err = SyncError::Transient("boom".into());
        fabric.note_failure("feed-1", &err, now);
        fabric.note_success("feed-1", now);
        assert!(fabric.should_retry("feed-1", &err));
        assert_eq!(fabric.consecutive_failures("feed-1"), 0);
    }
}

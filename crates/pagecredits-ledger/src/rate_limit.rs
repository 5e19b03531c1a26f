//! Ephemeral request counter for unauthenticated traffic.
//!
//! A coarse fixed-window throttle keyed by caller (IP address, anonymous
//! session). Counters live in process memory only and are all cleared
//! together on every tick of a background timer owned by the limiter. It is a
//! secondary defense; authenticated usage is bounded by the credit ledger.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Default interval between full counter resets.
pub const DEFAULT_RESET_INTERVAL: Duration = Duration::from_secs(3600);

type Counters = Arc<Mutex<HashMap<String, u64>>>;

/// Per-key request counter with periodic full reset.
#[derive(Debug)]
pub struct RateLimiter {
    counters: Counters,
    reset_task: Mutex<Option<JoinHandle<()>>>,
}

impl RateLimiter {
    /// Create a limiter whose counters are cleared every `interval`.
    ///
    /// The first reset happens one full interval after construction.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime, or if `interval` is zero.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        assert!(!interval.is_zero(), "rate limit reset interval must be non-zero");

        let counters: Counters = Arc::default();
        let task_counters = Arc::clone(&counters);
        let first_reset = Instant::now() + interval;

        let reset_task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(first_reset, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let cleared = clear(&task_counters);
                tracing::debug!(cleared, "Rate limit counters reset");
            }
        });

        Self {
            counters,
            reset_task: Mutex::new(Some(reset_task)),
        }
    }

    /// Count a request for `key` and decide whether it is allowed.
    ///
    /// The request is allowed when the count before this call was below
    /// `limit`, so exactly `limit` calls pass per window.
    pub fn check(&self, key: &str, limit: u64) -> bool {
        let mut counters = lock(&self.counters);
        let count = counters.entry(key.to_owned()).or_insert(0);
        let allowed = *count < limit;
        *count = count.saturating_add(1);

        if !allowed {
            tracing::warn!(key, limit, count = *count, "Rate limit exceeded");
        }
        allowed
    }

    /// Calls left for `key` in the current window. Does not count a request.
    #[must_use]
    pub fn remaining(&self, key: &str, limit: u64) -> u64 {
        let count = lock(&self.counters).get(key).copied().unwrap_or(0);
        limit.saturating_sub(count)
    }

    /// Clear every counter now.
    pub fn reset(&self) {
        clear(&self.counters);
    }

    /// Number of keys seen in the current window.
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        lock(&self.counters).len()
    }

    /// Whether the background reset timer is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        lock(&self.reset_task)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Stop the reset timer and drop all counters.
    ///
    /// Safe to call more than once.
    pub fn destroy(&self) {
        if let Some(task) = lock(&self.reset_task).take() {
            task.abort();
            tracing::debug!("Rate limiter reset timer stopped");
        }
        clear(&self.counters);
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.reset_task).take() {
            task.abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn clear(counters: &Mutex<HashMap<String, u64>>) -> usize {
    let mut counters = lock(counters);
    let cleared = counters.len();
    counters.clear();
    cleared
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_exactly_limit_calls() {
        let limiter = RateLimiter::new(DEFAULT_RESET_INTERVAL);

        for _ in 0..3 {
            assert!(limiter.check("10.0.0.1", 3));
        }
        assert!(!limiter.check("10.0.0.1", 3));
        assert!(!limiter.check("10.0.0.1", 3));
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let limiter = RateLimiter::new(DEFAULT_RESET_INTERVAL);

        assert!(limiter.check("a", 1));
        assert!(!limiter.check("a", 1));
        assert!(limiter.check("b", 1));
        assert_eq!(limiter.tracked_keys(), 2);
    }

    #[tokio::test]
    async fn remaining_does_not_count() {
        let limiter = RateLimiter::new(DEFAULT_RESET_INTERVAL);

        assert_eq!(limiter.remaining("k", 5), 5);
        assert_eq!(limiter.remaining("k", 5), 5);
        limiter.check("k", 5);
        limiter.check("k", 5);
        assert_eq!(limiter.remaining("k", 5), 3);
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[tokio::test]
    async fn remaining_floors_at_zero() {
        let limiter = RateLimiter::new(DEFAULT_RESET_INTERVAL);
        for _ in 0..4 {
            limiter.check("k", 2);
        }
        assert_eq!(limiter.remaining("k", 2), 0);
    }

    #[tokio::test]
    async fn zero_limit_denies_everything() {
        let limiter = RateLimiter::new(DEFAULT_RESET_INTERVAL);
        assert!(!limiter.check("k", 0));
        assert_eq!(limiter.remaining("k", 0), 0);
    }

    #[tokio::test]
    async fn manual_reset_clears_counts() {
        let limiter = RateLimiter::new(DEFAULT_RESET_INTERVAL);
        limiter.check("k", 1);
        limiter.reset();
        assert_eq!(limiter.remaining("k", 1), 1);
        assert!(limiter.check("k", 1));
    }

    #[tokio::test]
    async fn destroy_stops_timer_and_clears() {
        let limiter = RateLimiter::new(DEFAULT_RESET_INTERVAL);
        limiter.check("k", 10);
        assert!(limiter.is_running());

        limiter.destroy();
        tokio::task::yield_now().await;

        assert!(!limiter.is_running());
        assert_eq!(limiter.tracked_keys(), 0);

        // Idempotent.
        limiter.destroy();
    }
}

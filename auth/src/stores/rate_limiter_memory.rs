//! In-process fixed-window rate limiter.
//!
//! Counters live in this process only, so each instance enforces its own
//! budget. Use [`RedisRateLimiter`](super::RedisRateLimiter) when several
//! instances must share one.

use crate::providers::RateLimiter;
use checkin_core::environment::Clock;
use checkin_core::error::{CheckinError, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Number of tracked keys above which elapsed windows are swept.
const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct WindowCounter {
    started_at: DateTime<Utc>,
    window: Duration,
    count: u32,
}

impl WindowCounter {
    fn resets_at(&self) -> DateTime<Utc> {
        chrono::Duration::from_std(self.window)
            .ok()
            .and_then(|window| self.started_at.checked_add_signed(window))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Fixed-window counters keyed by client, driven by an injected [`Clock`].
///
/// Every request is counted, including the ones it rejects, so a client
/// hammering a closed window does not get a fresh budget early.
#[derive(Clone)]
pub struct FixedWindowRateLimiter {
    counters: Arc<Mutex<HashMap<String, WindowCounter>>>,
    clock: Arc<dyn Clock>,
}

impl FixedWindowRateLimiter {
    /// Create an empty limiter.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            counters: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    /// Number of keys currently tracked.
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.counters.lock().map_or(0, |counters| counters.len())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, WindowCounter>>> {
        self.counters
            .lock()
            .map_err(|_| CheckinError::Internal("rate limiter lock poisoned".to_string()))
    }
}

impl std::fmt::Debug for FixedWindowRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedWindowRateLimiter")
            .field("tracked_keys", &self.tracked_keys())
            .finish_non_exhaustive()
    }
}

impl RateLimiter for FixedWindowRateLimiter {
    async fn check_and_record(&self, key: &str, max_requests: u32, window: Duration) -> Result<()> {
        let now = self.clock.now();
        let mut counters = self.lock()?;

        if counters.len() > PRUNE_THRESHOLD {
            counters.retain(|_, counter| counter.resets_at() > now);
        }

        let counter = counters
            .entry(key.to_string())
            .and_modify(|counter| {
                if counter.resets_at() <= now {
                    *counter = WindowCounter {
                        started_at: now,
                        window,
                        count: 0,
                    };
                }
            })
            .or_insert(WindowCounter {
                started_at: now,
                window,
                count: 0,
            });

        counter.count = counter.count.saturating_add(1);

        if counter.count > max_requests {
            let retry_after = (counter.resets_at() - now).to_std().unwrap_or(Duration::ZERO);
            tracing::warn!(
                key = %key,
                attempts = counter.count,
                max_requests,
                retry_after_secs = retry_after.as_secs(),
                "Rate limit exceeded"
            );
            return Err(CheckinError::RateLimited { retry_after });
        }

        tracing::trace!(key = %key, attempts = counter.count, max_requests, "Rate limit check passed");
        Ok(())
    }

    async fn reset(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        tracing::info!(key = %key, "Reset rate limit");
        Ok(())
    }

    async fn get_attempts(&self, key: &str) -> Result<u32> {
        let now = self.clock.now();
        Ok(self
            .lock()?
            .get(key)
            .filter(|counter| counter.resets_at() > now)
            .map_or(0, |counter| counter.count))
    }
}

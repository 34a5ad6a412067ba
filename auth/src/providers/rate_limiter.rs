//! Rate limiter trait for request budgets.
//!
//! # Security
//!
//! Budgets bound brute-force login attempts, ticket farming and scanner
//! floods. A rejected request never reaches business logic.
//!
//! # Implementation
//!
//! Fixed windows: a counter per key that resets when its window elapses.
//! In-process for a single instance, Redis when horizontally scaled.

use checkin_core::error::Result;
use std::time::Duration;

/// Fixed-window request counter.
///
/// # Example
///
/// ```no_run
/// use checkin_auth::providers::RateLimiter;
/// use std::time::Duration;
///
/// # async fn example(limiter: impl RateLimiter) -> checkin_core::error::Result<()> {
/// // 10 login attempts per 15 minutes from one address
/// limiter.check_and_record("login:203.0.113.7", 10, Duration::from_secs(900)).await?;
/// # Ok(())
/// # }
/// ```
pub trait RateLimiter: Send + Sync {
    /// Count this request against `key` and reject it if over budget.
    ///
    /// # Arguments
    ///
    /// * `key` - Rate limit key (tier prefix plus client address)
    /// * `max_requests` - Requests allowed per window
    /// * `window` - Window length
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Budget exhausted → `CheckinError::RateLimited` with the time until
    ///   the window resets
    /// - `Redis` failure → `CheckinError::Store`
    fn check_and_record(
        &self,
        key: &str,
        max_requests: u32,
        window: Duration,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Forget every request counted against `key`.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store fails.
    fn reset(&self, key: &str) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Requests counted against `key` in its current window.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store fails.
    fn get_attempts(&self, key: &str) -> impl std::future::Future<Output = Result<u32>> + Send;
}

//! Redis-based rate limiter implementation.
//!
//! Shares fixed-window counters between every instance of the gateway.
//!
//! # Algorithm
//!
//! One counter key per client and tier, in a single atomic pipeline:
//! 1. `SET key 0 PX <window> NX` opens a window if none is running
//! 2. `INCR key` counts this request
//! 3. `PTTL key` reports how long the window has left
//!
//! The key expires with its window, so Redis needs no cleanup job.

use crate::providers::RateLimiter;
use checkin_core::error::{CheckinError, Result};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::time::Duration;

/// `Redis`-based fixed-window rate limiter.
///
/// # Example
///
/// ```no_run
/// use checkin_auth::stores::RedisRateLimiter;
/// use checkin_auth::providers::RateLimiter;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let limiter = RedisRateLimiter::new("redis://127.0.0.1:6379").await?;
///
/// // 10 login attempts per 15 minutes
/// limiter.check_and_record("login:203.0.113.7", 10, std::time::Duration::from_secs(900)).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RedisRateLimiter {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
}

impl RedisRateLimiter {
    /// Create a new `Redis` rate limiter.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - `Redis` connection URL (e.g., "<redis://127.0.0.1:6379>")
    ///
    /// # Errors
    ///
    /// Returns error if connection to `Redis` fails.
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| CheckinError::Store(format!("Failed to create Redis client: {e}")))?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            CheckinError::Store(format!("Failed to create Redis connection manager: {e}"))
        })?;

        Ok(Self { conn_manager })
    }

    fn rate_limit_key(key: &str) -> String {
        format!("checkin:rate_limit:{key}")
    }
}

impl std::fmt::Debug for RedisRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisRateLimiter").finish_non_exhaustive()
    }
}

impl RateLimiter for RedisRateLimiter {
    async fn check_and_record(&self, key: &str, max_requests: u32, window: Duration) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let rate_key = Self::rate_limit_key(key);
        #[allow(clippy::cast_possible_truncation)] // Rate limit windows are minutes, not eons
        let window_ms = window.as_millis().max(1) as u64;

        // Atomic, so two concurrent requests can never both see the same count.
        let (count, ttl_ms): (u64, i64) = redis::pipe()
            .atomic()
            .cmd("SET")
            .arg(&rate_key)
            .arg(0)
            .arg("PX")
            .arg(window_ms)
            .arg("NX")
            .ignore()
            .incr(&rate_key, 1)
            .pttl(&rate_key)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, key = %key, "Redis pipeline failed during rate limit check");
                CheckinError::Store(format!("Failed to check and record rate limit: {e}"))
            })?;

        // A counter without a TTL would never reset.
        let ttl_ms = if ttl_ms < 0 {
            #[allow(clippy::cast_possible_wrap)]
            let _: () = conn
                .pexpire(&rate_key, window_ms as i64)
                .await
                .map_err(|e| CheckinError::Store(format!("Failed to set rate limit expiry: {e}")))?;
            window_ms
        } else {
            ttl_ms.unsigned_abs()
        };

        if count > u64::from(max_requests) {
            let retry_after = Duration::from_millis(ttl_ms);
            tracing::warn!(
                key = %key,
                attempts = count,
                max_requests,
                retry_after_secs = retry_after.as_secs(),
                "Rate limit exceeded"
            );
            return Err(CheckinError::RateLimited { retry_after });
        }

        tracing::trace!(key = %key, attempts = count, max_requests, "Rate limit check passed");
        Ok(())
    }

    async fn reset(&self, key: &str) -> Result<()> {
        let mut conn = self.conn_manager.clone();

        let _: () = conn
            .del(Self::rate_limit_key(key))
            .await
            .map_err(|e| CheckinError::Store(format!("Failed to reset rate limit: {e}")))?;

        tracing::info!(key = %key, "Reset rate limit");
        Ok(())
    }

    async fn get_attempts(&self, key: &str) -> Result<u32> {
        let mut conn = self.conn_manager.clone();

        let count: Option<u64> = conn
            .get(Self::rate_limit_key(key))
            .await
            .map_err(|e| CheckinError::Store(format!("Failed to get rate limit attempts: {e}")))?;

        Ok(count.map_or(0, |count| u32::try_from(count).unwrap_or(u32::MAX)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // Note: These tests require a running Redis instance
    // Run with: docker run -d -p 6379:6379 redis:7-alpine

    async fn limiter() -> RedisRateLimiter {
        RedisRateLimiter::new("redis://127.0.0.1:6379").await.unwrap()
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn test_rate_limit_blocks_over_limit() {
        let limiter = limiter().await;
        let key = format!("test:block:{}", uuid::Uuid::new_v4());

        for i in 1..=5 {
            let result = limiter.check_and_record(&key, 5, Duration::from_secs(60)).await;
            assert!(result.is_ok(), "Attempt {i} should succeed");
        }

        let result = limiter.check_and_record(&key, 5, Duration::from_secs(60)).await;
        assert!(
            matches!(result, Err(CheckinError::RateLimited { retry_after }) if retry_after <= Duration::from_secs(60)),
            "6th attempt should be rate limited"
        );
        assert_eq!(limiter.get_attempts(&key).await.unwrap(), 6);

        limiter.reset(&key).await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn test_rate_limit_window_expires() {
        let limiter = limiter().await;
        let key = format!("test:window:{}", uuid::Uuid::new_v4());

        for _ in 0..3 {
            limiter.check_and_record(&key, 3, Duration::from_secs(1)).await.unwrap();
        }
        assert!(limiter.check_and_record(&key, 3, Duration::from_secs(1)).await.is_err());

        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(limiter.check_and_record(&key, 3, Duration::from_secs(1)).await.is_ok());
        limiter.reset(&key).await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn test_rate_limit_reset() {
        let limiter = limiter().await;
        let key = format!("test:reset:{}", uuid::Uuid::new_v4());

        limiter.check_and_record(&key, 1, Duration::from_secs(60)).await.unwrap();
        assert!(limiter.check_and_record(&key, 1, Duration::from_secs(60)).await.is_err());

        limiter.reset(&key).await.unwrap();
        assert_eq!(limiter.get_attempts(&key).await.unwrap(), 0);
        assert!(limiter.check_and_record(&key, 1, Duration::from_secs(60)).await.is_ok());

        limiter.reset(&key).await.unwrap();
    }
}

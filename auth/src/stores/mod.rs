//! Rate limiter backends.
//!
//! - **In-process** ([`FixedWindowRateLimiter`]) for a single instance
//! - **Redis** ([`RedisRateLimiter`]) when counters must be shared

pub mod rate_limiter_memory;
pub mod rate_limiter_redis;

pub use rate_limiter_memory::FixedWindowRateLimiter;
pub use rate_limiter_redis::RedisRateLimiter;

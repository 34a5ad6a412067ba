//! Authentication providers.
//!
//! Traits for the external dependencies of partner authentication that are
//! not already datastore traits in `checkin-core`, plus the HTTP identity
//! provider implementation.
//!
//! This enables:
//! - **Testing**: in-memory limiter, mock identity provider
//! - **Production**: Redis counters, the platform's identity service

pub mod gotrue;
pub mod rate_limiter;

pub use gotrue::GoTrueIdentityProvider;
pub use rate_limiter::RateLimiter;

//! # Check-in partner authentication and rate limiting
//!
//! Staff of a partner business log in with their platform credentials and
//! receive an HTTP-only session cookie. Every staff request is authenticated
//! against a hashed, revocable session row.
//!
//! ## Components
//!
//! - [`PartnerAuthService`]: login, authenticate, logout
//! - [`SessionTokenCodec`]: signed `partner_session` tokens
//! - [`providers::GoTrueIdentityProvider`]: credential checks against the hosted auth service
//! - [`TieredRateLimiter`]: login, ticket-issuance and ticket-validation budgets over a
//!   [`providers::RateLimiter`] backend ([`stores::FixedWindowRateLimiter`] or
//!   [`stores::RedisRateLimiter`])
//!
//! ## Example
//!
//! ```rust,ignore
//! let service = PartnerAuthService::new(store, identity, codec, SessionConfig::default(), clock);
//!
//! let outcome = service.login("staff@gym.example", "secret", &origin).await?;
//! // Set `outcome.token` as the session cookie...
//!
//! let partner = service.authenticate(&outcome.token).await?;
//! assert_eq!(partner.id, outcome.account.id);
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

pub mod config;
pub mod providers;
pub mod service;
pub mod stores;
pub mod tiered;
pub mod token;
pub mod utils;

pub use config::{RateLimitConfig, RateLimitPolicy, SessionConfig};
pub use service::{LoginOutcome, PartnerAuthService};
pub use tiered::{RateLimitTier, TieredRateLimiter};
pub use token::{SessionClaims, SessionTokenCodec};

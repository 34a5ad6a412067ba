//! Per-endpoint rate-limit tiers.
//!
//! Each tier has its own budget and its own key namespace, so exhausting the
//! login budget never touches a scanner's validation budget.

use crate::config::{RateLimitConfig, RateLimitPolicy};
use crate::providers::RateLimiter;
use checkin_core::error::Result;
use std::fmt;

/// A rate-limited endpoint family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitTier {
    /// `POST /api/auth/login`
    Login,
    /// `POST /api/checkin/token`
    TicketIssue,
    /// `POST /api/checkin/verify` and `POST /api/checkin/validate`
    TicketValidate,
}

impl RateLimitTier {
    /// Stable label, also used as the key prefix and metrics label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::TicketIssue => "ticket_issue",
            Self::TicketValidate => "ticket_validate",
        }
    }

    /// Namespaced counter key for a client.
    #[must_use]
    pub fn key(self, client_key: &str) -> String {
        format!("{}:{client_key}", self.as_str())
    }
}

impl fmt::Display for RateLimitTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A [`RateLimiter`] with one policy per [`RateLimitTier`].
#[derive(Debug, Clone)]
pub struct TieredRateLimiter<L> {
    limiter: L,
    config: RateLimitConfig,
}

impl<L: RateLimiter> TieredRateLimiter<L> {
    /// Wrap a limiter backend.
    #[must_use]
    pub const fn new(limiter: L, config: RateLimitConfig) -> Self {
        Self { limiter, config }
    }

    /// Policy applied to `tier`.
    #[must_use]
    pub const fn policy(&self, tier: RateLimitTier) -> RateLimitPolicy {
        match tier {
            RateLimitTier::Login => self.config.login,
            RateLimitTier::TicketIssue => self.config.ticket_issue,
            RateLimitTier::TicketValidate => self.config.ticket_validate,
        }
    }

    /// The underlying backend.
    #[must_use]
    pub const fn backend(&self) -> &L {
        &self.limiter
    }

    /// Count a request from `client_key` against `tier`.
    ///
    /// # Errors
    ///
    /// Returns `rate_limited` when the tier's budget is spent, or a store
    /// error from the backend.
    pub async fn check(&self, tier: RateLimitTier, client_key: &str) -> Result<()> {
        let policy = self.policy(tier);
        self.limiter
            .check_and_record(&tier.key(client_key), policy.max_requests, policy.window)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::stores::FixedWindowRateLimiter;
    use checkin_testing::mocks::test_clock;
    use std::sync::Arc;
    use std::time::Duration;

    const CLIENT: &str = "203.0.113.7";

    fn tiered(config: RateLimitConfig) -> TieredRateLimiter<FixedWindowRateLimiter> {
        TieredRateLimiter::new(FixedWindowRateLimiter::new(Arc::new(test_clock())), config)
    }

    #[test]
    fn test_keys_are_namespaced() {
        assert_eq!(RateLimitTier::Login.key(CLIENT), "login:203.0.113.7");
        assert_eq!(RateLimitTier::TicketIssue.to_string(), "ticket_issue");
        assert_eq!(
            RateLimitTier::TicketValidate.key(CLIENT),
            "ticket_validate:203.0.113.7"
        );
    }

    #[tokio::test]
    async fn test_eleventh_login_is_rejected() {
        let limiter = tiered(RateLimitConfig::default());

        for _ in 0..10 {
            limiter.check(RateLimitTier::Login, CLIENT).await.unwrap();
        }
        let err = limiter.check(RateLimitTier::Login, CLIENT).await.unwrap_err();
        assert_eq!(err.kind(), "rate_limited");
    }

    #[tokio::test]
    async fn test_tiers_do_not_share_counters() {
        let strict = RateLimitPolicy::new(1, Duration::from_secs(60));
        let limiter = tiered(
            RateLimitConfig::default()
                .with_login(strict)
                .with_ticket_issue(strict),
        );

        limiter.check(RateLimitTier::Login, CLIENT).await.unwrap();
        assert!(limiter.check(RateLimitTier::Login, CLIENT).await.is_err());

        limiter.check(RateLimitTier::TicketIssue, CLIENT).await.unwrap();
        limiter.check(RateLimitTier::TicketValidate, CLIENT).await.unwrap();
        assert_eq!(
            limiter
                .backend()
                .get_attempts(&RateLimitTier::Login.key(CLIENT))
                .await
                .unwrap(),
            2
        );
    }
}

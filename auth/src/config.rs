//! Authentication and rate-limit configuration.
//!
//! Configuration values are provided by the application, not hardcoded.

use chrono::Duration;

/// Partner session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Fixed session lifetime from issuance.
    ///
    /// Default: 12 hours
    pub lifetime: Duration,

    /// Name of the session cookie.
    ///
    /// Default: `partner_session`
    pub cookie_name: String,

    /// Longest device descriptor stored with a session.
    ///
    /// Default: 512 characters
    pub max_device_len: usize,
}

impl SessionConfig {
    /// Set session lifetime.
    #[must_use]
    pub const fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Set cookie name.
    #[must_use]
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lifetime: Duration::hours(12),
            cookie_name: "partner_session".to_string(),
            max_device_len: 512,
        }
    }
}

/// Budget for one rate-limit tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Requests allowed per window.
    pub max_requests: u32,
    /// Fixed window length.
    pub window: std::time::Duration,
}

impl RateLimitPolicy {
    /// Create a policy.
    #[must_use]
    pub const fn new(max_requests: u32, window: std::time::Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }
}

/// Budgets for the three rate-limit tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Login attempts.
    ///
    /// Default: 10 per 15 minutes
    pub login: RateLimitPolicy,

    /// Ticket issuance requests.
    ///
    /// Default: 10 per minute
    pub ticket_issue: RateLimitPolicy,

    /// Ticket validation requests, sized for about one scan per second.
    ///
    /// Default: 60 per minute
    pub ticket_validate: RateLimitPolicy,
}

impl RateLimitConfig {
    /// Set the login budget.
    #[must_use]
    pub const fn with_login(mut self, policy: RateLimitPolicy) -> Self {
        self.login = policy;
        self
    }

    /// Set the ticket issuance budget.
    #[must_use]
    pub const fn with_ticket_issue(mut self, policy: RateLimitPolicy) -> Self {
        self.ticket_issue = policy;
        self
    }

    /// Set the ticket validation budget.
    #[must_use]
    pub const fn with_ticket_validate(mut self, policy: RateLimitPolicy) -> Self {
        self.ticket_validate = policy;
        self
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            login: RateLimitPolicy::new(10, std::time::Duration::from_secs(15 * 60)),
            ticket_issue: RateLimitPolicy::new(10, std::time::Duration::from_secs(60)),
            ticket_validate: RateLimitPolicy::new(60, std::time::Duration::from_secs(60)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let session = SessionConfig::default();
        assert_eq!(session.lifetime, Duration::hours(12));
        assert_eq!(session.cookie_name, "partner_session");

        let limits = RateLimitConfig::default();
        assert_eq!(limits.login.max_requests, 10);
        assert_eq!(limits.login.window.as_secs(), 900);
        assert_eq!(limits.ticket_issue.max_requests, 10);
        assert_eq!(limits.ticket_validate.max_requests, 60);
    }

    #[test]
    fn test_builders() {
        let session = SessionConfig::default()
            .with_lifetime(Duration::hours(1))
            .with_cookie_name("staff");
        assert_eq!(session.lifetime, Duration::hours(1));
        assert_eq!(session.cookie_name, "staff");

        let strict = RateLimitPolicy::new(1, std::time::Duration::from_secs(1));
        let limits = RateLimitConfig::default().with_login(strict);
        assert_eq!(limits.login, strict);
        assert_eq!(limits.ticket_validate.max_requests, 60);
    }
}

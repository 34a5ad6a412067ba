//! Shared application state.
//!
//! Everything a handler needs, behind `Arc`s so cloning per request is
//! cheap. Generic over the datastore (`S`), the identity provider (`I`) and
//! the rate-limit backend (`L`) so tests can run the real router on mocks.

use crate::cookies::CookieConfig;
use crate::extractors::TrustedProxies;
use axum::extract::FromRef;
use checkin_auth::providers::RateLimiter;
use checkin_auth::{
    PartnerAuthService, RateLimitConfig, SessionConfig, SessionTokenCodec, TieredRateLimiter,
};
use checkin_core::environment::Clock;
use checkin_core::providers::{CheckinStore, IdentityProvider};
use checkin_core::{
    CheckinValidator, CheckinWindowCalculator, StaffConsole, TicketCodec, TicketIssuer,
};
use std::sync::Arc;

/// Secrets and policies the services are built from.
#[derive(Debug, Clone)]
pub struct StateConfig {
    /// Signs partner session tokens.
    pub session_codec: SessionTokenCodec,
    /// Signs check-in tickets.
    pub ticket_codec: TicketCodec,
    /// Session lifetime and device descriptor limits.
    pub session: SessionConfig,
    /// Per-tier request budgets.
    pub rate_limits: RateLimitConfig,
    /// Session cookie attributes.
    pub cookies: CookieConfig,
    /// Civil time zone for slot windows.
    pub calculator: CheckinWindowCalculator,
    /// Reverse proxies whose `X-Forwarded-For` entries are believed.
    pub trusted_proxies: TrustedProxies,
}

impl StateConfig {
    /// Config with default policies and the given signing secrets.
    #[must_use]
    pub fn new(session_secret: &[u8], ticket_secret: &[u8]) -> Self {
        let session = SessionConfig::default();
        let cookies = CookieConfig::default()
            .with_name(session.cookie_name.clone())
            .with_max_age(session.lifetime);
        Self {
            session_codec: SessionTokenCodec::new(session_secret),
            ticket_codec: TicketCodec::new(ticket_secret),
            session,
            rate_limits: RateLimitConfig::default(),
            cookies,
            calculator: CheckinWindowCalculator::default(),
            trusted_proxies: TrustedProxies::default(),
        }
    }
}

/// Application state shared by every handler.
pub struct AppState<S, I, L> {
    auth: Arc<PartnerAuthService<S, I>>,
    identity: Arc<I>,
    issuer: Arc<TicketIssuer<S>>,
    validator: Arc<CheckinValidator<S>>,
    console: Arc<StaffConsole<S>>,
    limiter: Arc<TieredRateLimiter<L>>,
    cookies: Arc<CookieConfig>,
    trusted_proxies: TrustedProxies,
    clock: Arc<dyn Clock>,
}

impl<S, I, L> Clone for AppState<S, I, L> {
    fn clone(&self) -> Self {
        Self {
            auth: Arc::clone(&self.auth),
            identity: Arc::clone(&self.identity),
            issuer: Arc::clone(&self.issuer),
            validator: Arc::clone(&self.validator),
            console: Arc::clone(&self.console),
            limiter: Arc::clone(&self.limiter),
            cookies: Arc::clone(&self.cookies),
            trusted_proxies: self.trusted_proxies,
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S, I, L> AppState<S, I, L>
where
    S: CheckinStore,
    I: IdentityProvider + 'static,
    L: RateLimiter + 'static,
{
    /// Wire the services over one datastore, identity provider and limiter.
    #[must_use]
    pub fn new(store: S, identity: I, limiter: L, config: StateConfig, clock: Arc<dyn Clock>) -> Self
    where
        I: Clone,
    {
        let auth = PartnerAuthService::new(
            store.clone(),
            identity.clone(),
            config.session_codec,
            config.session,
            Arc::clone(&clock),
        );
        let issuer = TicketIssuer::new(
            store.clone(),
            config.ticket_codec.clone(),
            config.calculator,
            Arc::clone(&clock),
        );
        let validator = CheckinValidator::new(
            store.clone(),
            config.ticket_codec,
            config.calculator,
            Arc::clone(&clock),
        );
        let console = StaffConsole::new(store, config.calculator, Arc::clone(&clock));

        Self {
            auth: Arc::new(auth),
            identity: Arc::new(identity),
            issuer: Arc::new(issuer),
            validator: Arc::new(validator),
            console: Arc::new(console),
            limiter: Arc::new(TieredRateLimiter::new(limiter, config.rate_limits)),
            cookies: Arc::new(config.cookies),
            trusted_proxies: config.trusted_proxies,
            clock,
        }
    }

    /// Partner login, session lookup and logout.
    #[must_use]
    pub fn auth(&self) -> &PartnerAuthService<S, I> {
        &self.auth
    }

    /// Identity provider, for attendee access tokens.
    #[must_use]
    pub fn identity(&self) -> &I {
        &self.identity
    }

    /// Ticket issuance.
    #[must_use]
    pub fn issuer(&self) -> &TicketIssuer<S> {
        &self.issuer
    }

    /// Ticket preview and redemption.
    #[must_use]
    pub fn validator(&self) -> &CheckinValidator<S> {
        &self.validator
    }

    /// Slot read models.
    #[must_use]
    pub fn console(&self) -> &StaffConsole<S> {
        &self.console
    }

    /// Tiered request budgets.
    #[must_use]
    pub fn limiter(&self) -> &TieredRateLimiter<L> {
        &self.limiter
    }

    /// Session cookie attributes.
    #[must_use]
    pub fn cookies(&self) -> &CookieConfig {
        &self.cookies
    }

    /// Time source.
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Reverse proxies trusted for the client address.
    #[must_use]
    pub const fn trusted_proxies(&self) -> TrustedProxies {
        self.trusted_proxies
    }
}

impl<S, I, L> FromRef<AppState<S, I, L>> for TrustedProxies {
    fn from_ref(state: &AppState<S, I, L>) -> Self {
        state.trusted_proxies
    }
}

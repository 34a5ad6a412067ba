//! Partner session lifecycle against the in-memory store.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use checkin_auth::stores::FixedWindowRateLimiter;
use checkin_auth::{
    PartnerAuthService, RateLimitConfig, RateLimitTier, SessionConfig, SessionTokenCodec,
    TieredRateLimiter,
};
use checkin_core::error::{AuthError, CheckinError};
use checkin_core::hasher::hash_secret;
use checkin_core::mocks::{InMemoryCheckinStore, MockIdentityProvider};
use checkin_core::types::{PartnerId, RequestOrigin};
use checkin_testing::fixtures::{PARTNER_EMAIL, PARTNER_PASSWORD};
use checkin_testing::{CheckinFixture, ManualClock};
use chrono::Duration;
use std::sync::Arc;

struct Harness {
    fixture: CheckinFixture,
    clock: ManualClock,
    service: PartnerAuthService<InMemoryCheckinStore, MockIdentityProvider>,
}

impl Harness {
    fn new() -> Self {
        checkin_testing::helpers::init_tracing();
        let fixture = CheckinFixture::new().unwrap();
        let clock = ManualClock::new(checkin_testing::fixtures::slot_start());
        let service = PartnerAuthService::new(
            fixture.store.clone(),
            fixture.identity.clone(),
            SessionTokenCodec::new(b"partner-session-secret"),
            SessionConfig::default(),
            Arc::new(clock.clone()),
        );
        Self {
            fixture,
            clock,
            service,
        }
    }
}

fn origin() -> RequestOrigin {
    RequestOrigin {
        ip_address: Some("203.0.113.7".parse().unwrap()),
        user_agent: Some("ScannerApp/2.1 (iPad)".to_string()),
    }
}

#[tokio::test]
async fn login_creates_hashed_session() {
    let h = Harness::new();

    let outcome = h
        .service
        .login(PARTNER_EMAIL, PARTNER_PASSWORD, &origin())
        .await
        .unwrap();

    assert_eq!(outcome.account.id, h.fixture.partner.id);
    assert_eq!(outcome.session.expires_at - outcome.session.created_at, Duration::hours(12));

    let stored = h
        .fixture
        .store
        .session(&hash_secret(&outcome.token))
        .unwrap()
        .expect("session row keyed by token hash");
    assert_eq!(stored.partner_id, h.fixture.partner.id);
    assert_ne!(stored.token_hash, outcome.token);
    assert_eq!(stored.device.as_deref(), Some("ScannerApp/2.1 (iPad)"));
    assert_eq!(stored.ip_address, origin().ip_address);

    let partner = h.service.authenticate(&outcome.token).await.unwrap();
    assert_eq!(partner.id, h.fixture.partner.id);
}

#[tokio::test]
async fn login_email_is_case_insensitive() {
    let h = Harness::new();
    let outcome = h
        .service
        .login(&PARTNER_EMAIL.to_uppercase(), PARTNER_PASSWORD, &origin())
        .await
        .unwrap();
    assert_eq!(outcome.account.id, h.fixture.partner.id);
}

#[tokio::test]
async fn wrong_password_is_invalid_credentials() {
    let h = Harness::new();
    let err = h
        .service
        .login(PARTNER_EMAIL, "wrong", &origin())
        .await
        .unwrap_err();
    assert_eq!(err, AuthError::InvalidCredentials.into());
    assert_eq!(h.fixture.store.session_count().unwrap(), 0);
}

#[tokio::test]
async fn malformed_input_is_rejected_before_identity_call() {
    let h = Harness::new();
    h.fixture.identity.set_unavailable(true).unwrap();

    for (email, password) in [("", "x"), ("not-an-email", "x"), (PARTNER_EMAIL, "")] {
        let err = h.service.login(email, password, &origin()).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }
}

#[tokio::test]
async fn identity_outage_is_internal() {
    let h = Harness::new();
    h.fixture.identity.set_unavailable(true).unwrap();

    let err = h
        .service
        .login(PARTNER_EMAIL, PARTNER_PASSWORD, &origin())
        .await
        .unwrap_err();
    assert!(err.is_internal());
}

#[tokio::test]
async fn non_business_account_is_forbidden() {
    let h = Harness::new();
    h.fixture
        .add_partner("someone@example.com", "pw-123456", "individual")
        .unwrap();

    let err = h
        .service
        .login("someone@example.com", "pw-123456", &origin())
        .await
        .unwrap_err();
    assert_eq!(err, AuthError::ForbiddenAccountType.into());
    assert_eq!(h.fixture.store.session_count().unwrap(), 0);
}

#[tokio::test]
async fn missing_account_row_is_forbidden() {
    let h = Harness::new();
    h.fixture
        .identity
        .add_partner("ghost@example.com", "pw-123456", PartnerId::new())
        .unwrap();

    let err = h
        .service
        .login("ghost@example.com", "pw-123456", &origin())
        .await
        .unwrap_err();
    assert_eq!(err, AuthError::ForbiddenAccountType.into());
}

#[tokio::test]
async fn logout_revokes_session() {
    let h = Harness::new();
    let outcome = h
        .service
        .login(PARTNER_EMAIL, PARTNER_PASSWORD, &origin())
        .await
        .unwrap();

    assert!(h.service.logout(&outcome.token).await.unwrap());
    assert!(!h.service.logout(&outcome.token).await.unwrap());

    let err = h.service.authenticate(&outcome.token).await.unwrap_err();
    assert_eq!(err, AuthError::InvalidToken.into());
}

#[tokio::test]
async fn session_expires_after_twelve_hours() {
    let h = Harness::new();
    let outcome = h
        .service
        .login(PARTNER_EMAIL, PARTNER_PASSWORD, &origin())
        .await
        .unwrap();

    h.clock.advance(Duration::hours(12) - Duration::seconds(1));
    assert!(h.service.authenticate(&outcome.token).await.is_ok());

    h.clock.advance(Duration::seconds(1));
    let err = h.service.authenticate(&outcome.token).await.unwrap_err();
    assert_eq!(err, AuthError::SessionExpired.into());
}

#[tokio::test]
async fn token_without_session_row_is_invalid() {
    let h = Harness::new();
    let now = checkin_testing::fixtures::slot_start();
    let token = SessionTokenCodec::new(b"partner-session-secret")
        .encode(
            h.fixture.partner.id,
            checkin_core::types::SessionId::new(),
            now,
            now + Duration::hours(12),
        )
        .unwrap();

    let err = h.service.authenticate(&token).await.unwrap_err();
    assert_eq!(err, AuthError::InvalidToken.into());
}

#[tokio::test]
async fn forged_token_is_invalid() {
    let h = Harness::new();
    let err = h.service.authenticate("not.a.token").await.unwrap_err();
    assert_eq!(err, AuthError::InvalidToken.into());
}

#[tokio::test]
async fn eleventh_login_is_rate_limited_even_with_good_credentials() {
    let h = Harness::new();
    let limiter = TieredRateLimiter::new(
        FixedWindowRateLimiter::new(Arc::new(h.clock.clone())),
        RateLimitConfig::default(),
    );
    let client = "203.0.113.7";

    for _ in 0..10 {
        limiter.check(RateLimitTier::Login, client).await.unwrap();
        let _ = h.service.login(PARTNER_EMAIL, "wrong", &origin()).await;
    }

    let err = limiter.check(RateLimitTier::Login, client).await.unwrap_err();
    assert!(matches!(err, CheckinError::RateLimited { .. }));

    h.clock.advance(Duration::minutes(15));
    limiter.check(RateLimitTier::Login, client).await.unwrap();
    h.service
        .login(PARTNER_EMAIL, PARTNER_PASSWORD, &origin())
        .await
        .unwrap();
}

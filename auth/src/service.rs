//! Partner session lifecycle: login, authenticate, logout.

use crate::config::SessionConfig;
use crate::token::SessionTokenCodec;
use crate::utils::{device_descriptor, is_valid_email};
use checkin_core::environment::Clock;
use checkin_core::error::{AuthError, CheckinError, Result};
use checkin_core::hasher::{hash_prefix, hash_secret};
use checkin_core::providers::{AccountRepository, IdentityProvider, SessionStore};
use checkin_core::types::{PartnerAccount, PartnerSession, RequestOrigin, SessionId};
use std::sync::Arc;

/// A successful login. `token` is returned to the caller exactly once.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// Raw session token, to be set as an HTTP-only cookie.
    pub token: String,
    /// The authenticated partner.
    pub account: PartnerAccount,
    /// The persisted session row.
    pub session: PartnerSession,
}

/// Issues, verifies and revokes partner staff sessions.
///
/// # Token precedence
///
/// Callers that can see both a session cookie and an `Authorization`
/// header must pass the cookie. See `checkin-web`'s partner extractor.
#[derive(Clone)]
pub struct PartnerAuthService<S, I> {
    store: S,
    identity: I,
    codec: SessionTokenCodec,
    config: SessionConfig,
    clock: Arc<dyn Clock>,
}

impl<S, I> PartnerAuthService<S, I>
where
    S: SessionStore + AccountRepository,
    I: IdentityProvider,
{
    /// Create the service.
    #[must_use]
    pub fn new(
        store: S,
        identity: I,
        codec: SessionTokenCodec,
        config: SessionConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            identity,
            codec,
            config,
            clock,
        }
    }

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Verify credentials and open a session.
    ///
    /// # Errors
    ///
    /// - `invalid_input` if the email or password is missing or malformed
    /// - `invalid_credentials` if the identity provider rejects them
    /// - `forbidden_account_type` if the account is missing or not a business
    /// - Identity provider, signing or datastore failures
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        origin: &RequestOrigin,
    ) -> Result<LoginOutcome> {
        let email = email.trim();
        if password.is_empty() || !is_valid_email(email) {
            return Err(CheckinError::InvalidInput(
                "email and password are required".to_string(),
            ));
        }

        let partner_id = match self.identity.verify_password(email, password).await {
            Ok(id) => id,
            Err(e) => {
                if !e.is_internal() {
                    tracing::info!(ip = ?origin.ip_address, "Partner login rejected by identity provider");
                }
                return Err(e);
            }
        };

        let account = self
            .store
            .get_partner_account(partner_id)
            .await?
            .filter(|account| account.account_type.is_business())
            .ok_or_else(|| {
                tracing::warn!(partner_id = %partner_id, "Login by a non-business account");
                AuthError::ForbiddenAccountType
            })?;

        let now = self.clock.now();
        let session_id = SessionId::new();
        let expires_at = now + self.config.lifetime;
        let token = self.codec.encode(account.id, session_id, now, expires_at)?;

        let session = PartnerSession {
            id: session_id,
            partner_id: account.id,
            token_hash: hash_secret(&token),
            device: device_descriptor(origin.user_agent.as_deref(), self.config.max_device_len),
            ip_address: origin.ip_address,
            created_at: now,
            expires_at,
            revoked_at: None,
        };
        self.store.create_session(&session).await?;

        tracing::info!(
            partner_id = %account.id,
            session_id = %session_id,
            expires_at = %expires_at,
            "Partner session created"
        );

        Ok(LoginOutcome {
            token,
            account,
            session,
        })
    }

    /// Resolve a presented session token to its partner account.
    ///
    /// Performs exactly one datastore read.
    ///
    /// # Errors
    ///
    /// - `invalid_token` for forged, malformed, unknown or revoked sessions
    /// - `session_expired` once the session's lifetime has elapsed
    /// - `forbidden_account_type` if the account is no longer a business
    pub async fn authenticate(&self, token: &str) -> Result<PartnerAccount> {
        let now = self.clock.now();
        let claims = self.codec.decode(token, now)?;

        let token_hash = hash_secret(token);
        let Some((session, account)) = self.store.find_session_with_account(&token_hash).await?
        else {
            tracing::debug!(session = hash_prefix(&token_hash), "Unknown partner session");
            return Err(AuthError::InvalidToken.into());
        };

        if session.revoked_at.is_some() {
            tracing::warn!(session_id = %session.id, "Revoked partner session presented");
            return Err(AuthError::InvalidToken.into());
        }

        if !session.is_valid_at(now) {
            return Err(AuthError::SessionExpired.into());
        }

        if session.id != claims.sid || account.id != claims.sub {
            tracing::warn!(session_id = %session.id, "Session token does not match its row");
            return Err(AuthError::InvalidToken.into());
        }

        if !account.account_type.is_business() {
            return Err(AuthError::ForbiddenAccountType.into());
        }

        Ok(account)
    }

    /// Revoke the session behind a token.
    ///
    /// # Returns
    ///
    /// `true` if a live session was revoked.
    ///
    /// # Errors
    ///
    /// Returns error if the datastore request fails.
    pub async fn logout(&self, token: &str) -> Result<bool> {
        let token_hash = hash_secret(token);
        let revoked = self
            .store
            .revoke_session(&token_hash, self.clock.now())
            .await?;

        tracing::info!(session = hash_prefix(&token_hash), revoked, "Partner logout");
        Ok(revoked)
    }
}

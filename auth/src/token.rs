//! Partner session tokens.
//!
//! Sessions are HS256 JWTs signed with the session secret and tagged
//! `typ = "partner_session"`, so no other token the platform signs (check-in
//! tickets included) can pass for one. The token also names its session row;
//! revocation is checked against that row on every request.

use checkin_core::error::{AuthError, CheckinError, Result};
use checkin_core::types::{PartnerId, SessionId};
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Type tag carried by every partner session token.
pub const SESSION_TOKEN_TYPE: &str = "partner_session";

/// Claims embedded in a partner session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the partner account ID.
    pub sub: PartnerId,
    /// Session row ID.
    pub sid: SessionId,
    /// Token type tag, always [`SESSION_TOKEN_TYPE`].
    pub typ: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
    /// Unique token ID.
    pub jti: Uuid,
}

/// Signs and verifies partner session tokens.
#[derive(Clone)]
pub struct SessionTokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl fmt::Debug for SessionTokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokenCodec").finish_non_exhaustive()
    }
}

impl SessionTokenCodec {
    /// Create a codec from the session signing secret.
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Sign a session token.
    ///
    /// # Errors
    ///
    /// Returns [`CheckinError::Crypto`] if signing fails.
    pub fn encode(
        &self,
        partner_id: PartnerId,
        session_id: SessionId,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<String> {
        let claims = SessionClaims {
            sub: partner_id,
            sid: session_id,
            typ: SESSION_TOKEN_TYPE.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| CheckinError::Crypto(format!("session token encode: {e}")))
    }

    /// Verify a session token's signature, type and expiry.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidToken`] for malformed, forged or wrongly-typed tokens
    /// - [`AuthError::SessionExpired`] for a validly signed token past `exp`
    pub fn decode(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the injected clock below.
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                match e.kind() {
                    ErrorKind::InvalidSignature => {
                        tracing::warn!("Session token with invalid signature");
                    }
                    _ => tracing::debug!(error = %e, "Malformed session token"),
                }
                AuthError::InvalidToken
            })?;

        if claims.typ != SESSION_TOKEN_TYPE {
            return Err(AuthError::InvalidToken.into());
        }

        if claims.exp <= now.timestamp() {
            return Err(AuthError::SessionExpired.into());
        }

        Ok(claims)
    }
}

//! Check-in ticket tokens.
//!
//! A ticket is an HS256 JWT signed with a secret distinct from the partner
//! session secret. It carries the registration it admits, a random nonce so
//! that every issuance yields a different token, and its expiry. The
//! datastore only ever sees the SHA-256 of the full token string.

use crate::error::{CheckinError, Result, ValidationError};
use crate::hasher::{generate_secret, hash_secret};
use crate::types::SlotParticipantId;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type tag carried by every check-in ticket.
pub const TICKET_TOKEN_TYPE: &str = "checkin";

/// Claims embedded in a check-in ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketClaims {
    /// Token type tag, always [`TICKET_TOKEN_TYPE`].
    pub typ: String,
    /// Slot participant the ticket admits.
    pub sp: SlotParticipantId,
    /// Random nonce.
    pub n: String,
    /// Expiration (Unix timestamp).
    pub exp: i64,
}

/// A freshly minted ticket. `token` is handed to the attendee exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedTicket {
    /// Raw bearer token.
    pub token: String,
    /// SHA-256 of `token`, the only form that is persisted.
    pub token_hash: String,
    /// Ticket expiry.
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies check-in tickets.
#[derive(Clone)]
pub struct TicketCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl fmt::Debug for TicketCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TicketCodec").finish_non_exhaustive()
    }
}

impl TicketCodec {
    /// Create a codec from the ticket signing secret.
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Mint a ticket for a registration.
    ///
    /// # Errors
    ///
    /// Returns [`CheckinError::Crypto`] if signing fails.
    pub fn encode(
        &self,
        participant_id: SlotParticipantId,
        expires_at: DateTime<Utc>,
    ) -> Result<IssuedTicket> {
        let claims = TicketClaims {
            typ: TICKET_TOKEN_TYPE.to_string(),
            sp: participant_id,
            n: generate_secret(),
            exp: expires_at.timestamp(),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| CheckinError::Crypto(format!("ticket encode: {e}")))?;

        Ok(IssuedTicket {
            token_hash: hash_secret(&token),
            token,
            expires_at,
        })
    }

    /// Verify a presented ticket's signature, type and expiry.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::TicketNotFound`] for malformed, forged or
    ///   wrongly-typed tokens
    /// - [`ValidationError::TicketExpired`] when `exp` is not after `now`
    pub fn decode(&self, token: &str, now: DateTime<Utc>) -> Result<TicketClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the injected clock below.
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp"]);

        let claims = jsonwebtoken::decode::<TicketClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected check-in ticket");
                ValidationError::TicketNotFound
            })?;

        if claims.typ != TICKET_TOKEN_TYPE {
            return Err(ValidationError::TicketNotFound.into());
        }

        if claims.exp <= now.timestamp() {
            return Err(ValidationError::TicketExpired.into());
        }

        Ok(claims)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn codec() -> TicketCodec {
        TicketCodec::new(b"ticket-secret-for-tests")
    }

    #[test]
    fn test_encode_then_decode() {
        let now = Utc::now();
        let participant = SlotParticipantId::new();
        let issued = codec().encode(participant, now + Duration::hours(2)).unwrap();

        assert_eq!(issued.token_hash, hash_secret(&issued.token));

        let claims = codec().decode(&issued.token, now).unwrap();
        assert_eq!(claims.typ, TICKET_TOKEN_TYPE);
        assert_eq!(claims.sp, participant);
        assert_eq!(claims.exp, (now + Duration::hours(2)).timestamp());
    }

    #[test]
    fn test_each_issuance_is_distinct() {
        let now = Utc::now();
        let participant = SlotParticipantId::new();
        let a = codec().encode(participant, now + Duration::hours(2)).unwrap();
        let b = codec().encode(participant, now + Duration::hours(2)).unwrap();
        assert_ne!(a.token, b.token);
        assert_ne!(a.token_hash, b.token_hash);
    }

    #[test]
    fn test_wrong_secret_is_not_found() {
        let now = Utc::now();
        let issued = TicketCodec::new(b"other-secret")
            .encode(SlotParticipantId::new(), now + Duration::hours(1))
            .unwrap();

        let err = codec().decode(&issued.token, now).unwrap_err();
        assert_eq!(err, ValidationError::TicketNotFound.into());
    }

    #[test]
    fn test_wrong_type_is_not_found() {
        #[derive(Serialize)]
        struct SessionLike {
            typ: &'static str,
            sp: SlotParticipantId,
            n: &'static str,
            exp: i64,
        }

        let now = Utc::now();
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &SessionLike {
                typ: "partner_session",
                sp: SlotParticipantId::new(),
                n: "nonce",
                exp: (now + Duration::hours(1)).timestamp(),
            },
            &EncodingKey::from_secret(b"ticket-secret-for-tests"),
        )
        .unwrap();

        let err = codec().decode(&token, now).unwrap_err();
        assert_eq!(err, ValidationError::TicketNotFound.into());
    }

    #[test]
    fn test_expired_uses_supplied_clock() {
        let now = Utc::now();
        let issued = codec().encode(SlotParticipantId::new(), now + Duration::minutes(5)).unwrap();

        assert!(codec().decode(&issued.token, now).is_ok());
        let err = codec()
            .decode(&issued.token, now + Duration::minutes(5))
            .unwrap_err();
        assert_eq!(err, ValidationError::TicketExpired.into());
    }

    #[test]
    fn test_garbage_is_not_found() {
        for token in ["", "not-a-jwt", "a.b.c"] {
            let err = codec().decode(token, Utc::now()).unwrap_err();
            assert_eq!(err.kind(), "ticket_not_found");
        }
    }
}

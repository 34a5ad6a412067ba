//! Error types for the check-in subsystem.
//!
//! Every failure a caller can observe carries a stable, machine-readable
//! kind (see [`CheckinError::kind`]). The HTTP layer maps kinds to status
//! codes; nothing here knows about HTTP.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for check-in operations.
pub type Result<T> = std::result::Result<T, CheckinError>;

/// Partner authentication failures.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// The identity provider rejected the email/password pair.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The account exists but is not classified as a business account.
    #[error("Account type is not allowed to use the staff console")]
    ForbiddenAccountType,

    /// The session token was valid but has reached its expiry.
    #[error("Session has expired")]
    SessionExpired,

    /// The session token is malformed, forged, of the wrong type, unknown or revoked.
    #[error("Invalid session token")]
    InvalidToken,
}

impl AuthError {
    /// Stable machine-readable kind.
    #[must_use]
    pub const fn kind(self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid_credentials",
            Self::ForbiddenAccountType => "forbidden_account_type",
            Self::SessionExpired => "session_expired",
            Self::InvalidToken => "invalid_token",
        }
    }
}

/// Ticket issuance and redemption outcomes that are not successes.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// No ticket matches the presented secret.
    #[error("Ticket not found")]
    TicketNotFound,

    /// The ticket's expiry has passed (naturally or by supersession).
    #[error("Ticket has expired")]
    TicketExpired,

    /// The ticket, or the participant it belongs to, was already checked in.
    #[error("Ticket has already been redeemed")]
    AlreadyRedeemed,

    /// The current instant is outside the slot's check-in window.
    #[error("Outside of the check-in window")]
    OutsideWindow,

    /// The requesting attendee does not own the registration.
    #[error("Registration belongs to another user")]
    NotOwner,

    /// The slot's check-in window has already closed.
    #[error("Slot has already finished")]
    SlotFinished,

    /// The registration referenced by the request does not exist.
    #[error("Registration not found")]
    ParticipantNotFound,

    /// The staff member's business does not host the slot's activity.
    #[error("Activity is hosted by another partner")]
    ForeignActivity,

    /// The slot referenced by the request does not exist.
    #[error("Slot not found")]
    SlotNotFound,
}

impl ValidationError {
    /// Stable machine-readable kind.
    #[must_use]
    pub const fn kind(self) -> &'static str {
        match self {
            Self::TicketNotFound => "ticket_not_found",
            Self::TicketExpired => "ticket_expired",
            Self::AlreadyRedeemed => "already_redeemed",
            Self::OutsideWindow => "outside_window",
            Self::NotOwner => "not_owner",
            Self::SlotFinished => "slot_finished",
            Self::ParticipantNotFound => "participant_not_found",
            Self::ForeignActivity => "foreign_activity",
            Self::SlotNotFound => "slot_not_found",
        }
    }
}

/// Umbrella error for every check-in operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CheckinError {
    /// Partner authentication failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Ticket issuance or redemption was refused.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A request budget was exhausted.
    #[error("Too many requests, retry after {retry_after:?}")]
    RateLimited {
        /// Time until the current window closes.
        retry_after: Duration,
    },

    /// Caller supplied malformed input (bad date, missing field).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Datastore failure.
    #[error("Datastore error: {0}")]
    Store(String),

    /// Identity provider failure (unreachable, unexpected response).
    #[error("Identity provider error: {0}")]
    Identity(String),

    /// Signing or hashing failure.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// Anything else that should never happen.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CheckinError {
    /// Stable machine-readable kind.
    ///
    /// # Examples
    ///
    /// ```
    /// # use checkin_core::error::{CheckinError, ValidationError};
    /// let err = CheckinError::from(ValidationError::AlreadyRedeemed);
    /// assert_eq!(err.kind(), "already_redeemed");
    /// ```
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Auth(e) => e.kind(),
            Self::Validation(e) => e.kind(),
            Self::RateLimited { .. } => "rate_limited",
            Self::InvalidInput(_) => "invalid_input",
            Self::Store(_) | Self::Identity(_) | Self::Crypto(_) | Self::Internal(_) => {
                "internal_error"
            }
        }
    }

    /// Returns `true` for failures the caller did not cause.
    ///
    /// These are reported as generic server errors and logged.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Store(_) | Self::Identity(_) | Self::Crypto(_) | Self::Internal(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_stable() {
        assert_eq!(AuthError::InvalidCredentials.kind(), "invalid_credentials");
        assert_eq!(AuthError::ForbiddenAccountType.kind(), "forbidden_account_type");
        assert_eq!(AuthError::SessionExpired.kind(), "session_expired");
        assert_eq!(AuthError::InvalidToken.kind(), "invalid_token");
        assert_eq!(ValidationError::TicketNotFound.kind(), "ticket_not_found");
        assert_eq!(ValidationError::TicketExpired.kind(), "ticket_expired");
        assert_eq!(ValidationError::OutsideWindow.kind(), "outside_window");
        assert_eq!(ValidationError::NotOwner.kind(), "not_owner");
        assert_eq!(ValidationError::SlotFinished.kind(), "slot_finished");
        assert_eq!(
            CheckinError::RateLimited { retry_after: Duration::from_secs(1) }.kind(),
            "rate_limited"
        );
    }

    #[test]
    fn test_internal_errors_are_generic() {
        let err = CheckinError::Store("connection reset".into());
        assert!(err.is_internal());
        assert_eq!(err.kind(), "internal_error");
        assert!(!CheckinError::from(AuthError::InvalidToken).is_internal());
    }
}

//! Partner session store trait.

use crate::error::Result;
use crate::types::{PartnerAccount, PartnerSession};
use chrono::{DateTime, Utc};

/// Partner session store.
///
/// # Implementation Notes
///
/// - Sessions are looked up by token hash only
/// - Rows are never deleted; logout sets `revoked_at`
/// - `find_session_with_account` is the single read performed on every
///   authenticated request
pub trait SessionStore: Send + Sync {
    /// Persist a new session.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Datastore request fails
    /// - The token hash already exists
    fn create_session(
        &self,
        session: &PartnerSession,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Find a session and its owning account by token hash.
    ///
    /// Revoked and expired sessions are returned as-is; the caller decides.
    ///
    /// # Returns
    ///
    /// `None` if no session (or no account) matches.
    ///
    /// # Errors
    ///
    /// Returns error if the datastore request fails.
    fn find_session_with_account(
        &self,
        token_hash: &str,
    ) -> impl std::future::Future<Output = Result<Option<(PartnerSession, PartnerAccount)>>> + Send;

    /// Revoke the session matching a token hash.
    ///
    /// # Returns
    ///
    /// `true` if a live session was revoked, `false` if none matched or it
    /// was already revoked.
    ///
    /// # Errors
    ///
    /// Returns error if the datastore request fails.
    fn revoke_session(
        &self,
        token_hash: &str,
        revoked_at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;
}

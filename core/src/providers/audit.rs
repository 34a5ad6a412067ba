//! Check-in audit trail.

use crate::error::Result;
use crate::types::CheckinLogEntry;

/// Append-only audit log of issuance and redemption attempts.
pub trait AuditLog: Send + Sync {
    /// Append an entry.
    ///
    /// # Errors
    ///
    /// Returns error if the datastore request fails. Callers log the
    /// failure and carry on.
    fn record(
        &self,
        entry: &CheckinLogEntry,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

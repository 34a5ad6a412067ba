//! Partner account lookups.

use crate::error::Result;
use crate::types::{PartnerAccount, PartnerId};

/// Read-only access to partner accounts.
///
/// Accounts are created by the general registration flow; this subsystem
/// never writes them.
pub trait AccountRepository: Send + Sync {
    /// Get a partner account by ID.
    ///
    /// # Returns
    ///
    /// `None` when no account exists for this ID.
    ///
    /// # Errors
    ///
    /// Returns error if the datastore request fails.
    fn get_partner_account(
        &self,
        partner_id: PartnerId,
    ) -> impl std::future::Future<Output = Result<Option<PartnerAccount>>> + Send;
}

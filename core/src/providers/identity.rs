//! External identity provider.

use crate::error::Result;
use crate::types::{PartnerId, UserId};

/// Credential verification delegated to the platform's identity service.
///
/// The same identity service authenticates partners (email and password)
/// and attendees (their own access token). The two never share a token.
pub trait IdentityProvider: Send + Sync {
    /// Verify an email/password pair.
    ///
    /// # Returns
    ///
    /// The account ID the credentials belong to.
    ///
    /// # Errors
    ///
    /// - `AuthError::InvalidCredentials` if the pair is rejected
    /// - `CheckinError::Identity` if the provider is unreachable
    fn verify_password(
        &self,
        email: &str,
        password: &str,
    ) -> impl std::future::Future<Output = Result<PartnerId>> + Send;

    /// Resolve an attendee access token to its user.
    ///
    /// # Errors
    ///
    /// - `AuthError::InvalidToken` if the token is rejected
    /// - `CheckinError::Identity` if the provider is unreachable
    fn authenticate_attendee(
        &self,
        access_token: &str,
    ) -> impl std::future::Future<Output = Result<UserId>> + Send;
}

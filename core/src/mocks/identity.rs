//! Mock identity provider for testing.

use crate::error::{AuthError, CheckinError, Result};
use crate::providers::IdentityProvider;
use crate::types::{PartnerId, UserId};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Inner {
    partners: HashMap<String, (String, PartnerId)>,
    attendees: HashMap<String, UserId>,
    unavailable: bool,
}

/// Mock identity provider.
///
/// Holds email/password pairs and attendee access tokens in memory.
#[derive(Debug, Clone, Default)]
pub struct MockIdentityProvider {
    inner: Arc<Mutex<Inner>>,
}

impl MockIdentityProvider {
    /// Create an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut Inner) -> Result<R>) -> Result<R> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| CheckinError::Internal("Mutex lock failed".to_string()))?;
        f(&mut inner)
    }

    /// Register partner credentials.
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn add_partner(&self, email: &str, password: &str, partner_id: PartnerId) -> Result<()> {
        self.with(|inner| {
            inner
                .partners
                .insert(email.to_lowercase(), (password.to_string(), partner_id));
            Ok(())
        })
    }

    /// Register an attendee access token.
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn add_attendee_token(&self, access_token: &str, user_id: UserId) -> Result<()> {
        self.with(|inner| {
            inner.attendees.insert(access_token.to_string(), user_id);
            Ok(())
        })
    }

    /// Simulate an outage: every call fails with an identity error.
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn set_unavailable(&self, unavailable: bool) -> Result<()> {
        self.with(|inner| {
            inner.unavailable = unavailable;
            Ok(())
        })
    }
}

impl IdentityProvider for MockIdentityProvider {
    fn verify_password(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<PartnerId>> + Send {
        std::future::ready(self.with(|inner| {
            if inner.unavailable {
                return Err(CheckinError::Identity("identity provider unavailable".to_string()));
            }
            match inner.partners.get(&email.to_lowercase()) {
                Some((expected, partner_id))
                    if constant_time_eq::constant_time_eq(
                        expected.as_bytes(),
                        password.as_bytes(),
                    ) =>
                {
                    Ok(*partner_id)
                }
                _ => Err(AuthError::InvalidCredentials.into()),
            }
        }))
    }

    fn authenticate_attendee(
        &self,
        access_token: &str,
    ) -> impl Future<Output = Result<UserId>> + Send {
        std::future::ready(self.with(|inner| {
            if inner.unavailable {
                return Err(CheckinError::Identity("identity provider unavailable".to_string()));
            }
            inner
                .attendees
                .get(access_token)
                .copied()
                .ok_or_else(|| AuthError::InvalidToken.into())
        }))
    }
}

//! GoTrue-compatible identity provider.
//!
//! Talks to the platform's hosted auth service over HTTP:
//!
//! - `POST {base}/auth/v1/token?grant_type=password` verifies partner credentials
//! - `GET {base}/auth/v1/user` resolves an attendee's own access token
//!
//! Both requests carry the project API key in the `apikey` header.

use checkin_core::error::{AuthError, CheckinError, Result};
use checkin_core::providers::IdentityProvider;
use checkin_core::types::{PartnerId, UserId};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

/// Request timeout for identity calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct GoTrueUser {
    id: Uuid,
}

#[derive(Debug, Deserialize)]
struct PasswordGrantResponse {
    user: GoTrueUser,
}

/// HTTP client for a GoTrue-compatible auth service.
#[derive(Debug, Clone)]
pub struct GoTrueIdentityProvider {
    http_client: Client,
    base_url: String,
    api_key: String,
}

impl GoTrueIdentityProvider {
    /// Create a provider with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`CheckinError::Identity`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CheckinError::Identity(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(http_client, base_url, api_key))
    }

    /// Create a provider around an existing HTTP client.
    #[must_use]
    pub fn with_client(
        http_client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

impl IdentityProvider for GoTrueIdentityProvider {
    async fn verify_password(&self, email: &str, password: &str) -> Result<PartnerId> {
        let response = self
            .http_client
            .post(format!("{}/auth/v1/token", self.base_url))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| CheckinError::Identity(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::UNPROCESSABLE_ENTITY => {
                return Err(AuthError::InvalidCredentials.into());
            }
            status => {
                let error_body = response.text().await.unwrap_or_default();
                tracing::error!(%status, body = %error_body, "Identity password grant failed");
                return Err(CheckinError::Identity(format!(
                    "password grant returned {status}"
                )));
            }
        }

        let grant: PasswordGrantResponse = response
            .json()
            .await
            .map_err(|e| CheckinError::Identity(e.to_string()))?;

        Ok(PartnerId::from_uuid(grant.user.id))
    }

    async fn authenticate_attendee(&self, access_token: &str) -> Result<UserId> {
        let response = self
            .http_client
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| CheckinError::Identity(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(AuthError::InvalidToken.into());
            }
            status => {
                let error_body = response.text().await.unwrap_or_default();
                tracing::error!(%status, body = %error_body, "Identity user lookup failed");
                return Err(CheckinError::Identity(format!(
                    "user lookup returned {status}"
                )));
            }
        }

        let user: GoTrueUser = response
            .json()
            .await
            .map_err(|e| CheckinError::Identity(e.to_string()))?;

        Ok(UserId::from_uuid(user.id))
    }
}

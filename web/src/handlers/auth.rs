//! Partner session endpoints: login, logout and the current partner.

use crate::error::AppError;
use crate::extractors::{ApiJson, AuthenticatedPartner, ClientOrigin};
use crate::metrics;
use crate::state::AppState;
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header},
};
use checkin_auth::providers::RateLimiter;
use checkin_core::providers::{CheckinStore, IdentityProvider};
use checkin_core::types::{PartnerAccount, PartnerId};
use serde::{Deserialize, Serialize};

/// `POST /api/auth/login` body.
///
/// Missing fields deserialize as empty and are rejected as `invalid_input`
/// by the auth service.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Partner email.
    #[serde(default)]
    pub email: String,
    /// Partner password.
    #[serde(default)]
    pub password: String,
}

/// Partner as returned by login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerSummary {
    /// Account ID.
    pub id: PartnerId,
    /// Display name.
    pub name: String,
    /// Business name.
    pub business_name: Option<String>,
}

impl From<&PartnerAccount> for PartnerSummary {
    fn from(account: &PartnerAccount) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            business_name: account.business_name.clone(),
        }
    }
}

/// Partner as returned by `me`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerProfile {
    /// ID, name and business name.
    #[serde(flatten)]
    pub summary: PartnerSummary,
    /// Business logo.
    pub logo_url: Option<String>,
}

/// `{ "partner": ... }`
#[derive(Debug, Serialize)]
pub struct PartnerEnvelope<T> {
    /// The partner.
    pub partner: T,
}

/// `{ "success": true }`
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    /// Always `true`.
    pub success: bool,
}

/// `POST /api/auth/login`
///
/// Opens a session and sets the session cookie.
///
/// # Errors
///
/// `invalid_input`, `invalid_credentials`, `forbidden_account_type`, or an
/// internal error.
pub async fn login<S, I, L>(
    State(state): State<AppState<S, I, L>>,
    ClientOrigin(origin): ClientOrigin,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<(HeaderMap, Json<PartnerEnvelope<PartnerSummary>>), AppError>
where
    S: CheckinStore,
    I: IdentityProvider + 'static,
    L: RateLimiter + 'static,
{
    let outcome = match state.auth().login(&body.email, &body.password, &origin).await {
        Ok(outcome) => {
            metrics::record_login("success");
            outcome
        }
        Err(err) => {
            metrics::record_login(err.kind());
            return Err(err.into());
        }
    };

    let cookie = state
        .cookies()
        .session_cookie(&outcome.token)
        .ok_or_else(AppError::internal)?;
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, cookie);

    Ok((
        headers,
        Json(PartnerEnvelope {
            partner: PartnerSummary::from(&outcome.account),
        }),
    ))
}

/// `POST /api/auth/logout`
///
/// Revokes the session and clears the cookie.
///
/// # Errors
///
/// Returns an internal error if the datastore fails.
pub async fn logout<S, I, L>(
    State(state): State<AppState<S, I, L>>,
    partner: AuthenticatedPartner,
) -> Result<(HeaderMap, Json<SuccessResponse>), AppError>
where
    S: CheckinStore,
    I: IdentityProvider + 'static,
    L: RateLimiter + 'static,
{
    state.auth().logout(&partner.token).await?;

    let mut headers = HeaderMap::new();
    if let Some(clear) = state.cookies().clear_cookie() {
        headers.insert(header::SET_COOKIE, clear);
    }

    Ok((headers, Json(SuccessResponse { success: true })))
}

/// `GET /api/auth/me`
#[allow(clippy::unused_async)]
pub async fn me(partner: AuthenticatedPartner) -> Json<PartnerEnvelope<PartnerProfile>> {
    let account = partner.account;
    Json(PartnerEnvelope {
        partner: PartnerProfile {
            summary: PartnerSummary::from(&account),
            logo_url: account.logo_url,
        },
    })
}

//! Health check endpoint.
//!
//! Used by load balancers and monitoring to verify the process is serving.

use crate::state::AppState;
use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// `GET /health` body.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `true` while the process serves requests.
    pub ok: bool,
    /// Server time.
    pub time: DateTime<Utc>,
}

/// `GET /health`
#[allow(clippy::unused_async)]
pub async fn health_check<S, I, L>(State(state): State<AppState<S, I, L>>) -> Json<HealthResponse>
where
    S: checkin_core::CheckinStore,
    I: checkin_core::providers::IdentityProvider + 'static,
    L: checkin_auth::providers::RateLimiter + 'static,
{
    Json(HealthResponse {
        ok: true,
        time: state.clock().now(),
    })
}

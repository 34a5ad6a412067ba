//! Router configuration.
//!
//! Builds the complete Axum router: health check, partner auth routes and
//! check-in routes under `/api`, with tracing, correlation IDs and CORS.

use crate::handlers::{auth, checkin, health_check};
use crate::middleware::{
    correlation_id_layer, login_rate_limit, ticket_issue_rate_limit, ticket_validate_rate_limit,
};
use crate::state::AppState;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware::from_fn_with_state,
    routing::{get, post},
};
use checkin_auth::providers::RateLimiter;
use checkin_core::providers::{CheckinStore, IdentityProvider};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// CORS for the staff console's origin, with credentials.
#[must_use]
pub fn cors_layer(origin: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Build the application router.
pub fn build_router<S, I, L>(state: AppState<S, I, L>, cors: CorsLayer) -> Router
where
    S: CheckinStore,
    I: IdentityProvider + 'static,
    L: RateLimiter + 'static,
{
    let auth_routes = Router::new()
        .route(
            "/login",
            post(auth::login::<S, I, L>)
                .route_layer(from_fn_with_state(state.clone(), login_rate_limit::<S, I, L>)),
        )
        .route("/logout", post(auth::logout::<S, I, L>))
        .route("/me", get(auth::me));

    let scan_limit = from_fn_with_state(state.clone(), ticket_validate_rate_limit::<S, I, L>);
    let checkin_routes = Router::new()
        .route(
            "/token",
            post(checkin::issue_ticket::<S, I, L>).route_layer(from_fn_with_state(
                state.clone(),
                ticket_issue_rate_limit::<S, I, L>,
            )),
        )
        .route(
            "/verify",
            post(checkin::verify_ticket::<S, I, L>).route_layer(scan_limit.clone()),
        )
        .route(
            "/validate",
            post(checkin::validate_ticket::<S, I, L>).route_layer(scan_limit),
        )
        .route("/slots/:slot_id/status", get(checkin::slot_status::<S, I, L>))
        .route("/today-slots", get(checkin::today_slots::<S, I, L>));

    Router::new()
        .route("/health", get(health_check::<S, I, L>))
        .nest("/api/auth", auth_routes)
        .nest("/api/checkin", checkin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .layer(cors)
        .with_state(state)
}

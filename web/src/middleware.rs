//! Request tracking and rate-limit middleware.
//!
//! # Correlation IDs
//!
//! 1. Read `X-Correlation-ID` from the request, or generate a UUID
//! 2. Store it in the request extensions
//! 3. Run the request inside an `http_request` span carrying the ID
//! 4. Echo the ID on the response
//!
//! # Rate limits
//!
//! One `from_fn_with_state` middleware per [`RateLimitTier`], installed as
//! a route layer so a rejected request never reaches extractors or the
//! handler:
//!
//! ```ignore
//! .route(
//!     "/login",
//!     post(handlers::auth::login::<S, I, L>)
//!         .route_layer(from_fn_with_state(state.clone(), login_rate_limit::<S, I, L>)),
//! )
//! ```

use crate::error::AppError;
use crate::extractors::client_ip;
use crate::metrics;
use crate::state::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use checkin_auth::RateLimitTier;
use checkin_auth::providers::RateLimiter;
use checkin_core::error::CheckinError;
use checkin_core::providers::{CheckinStore, IdentityProvider};
use std::net::SocketAddr;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// Correlation ID header name.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Create the correlation ID layer.
#[must_use]
pub const fn correlation_id_layer() -> CorrelationIdLayer {
    CorrelationIdLayer
}

/// Layer that wraps services with [`CorrelationIdMiddleware`].
#[derive(Clone, Debug)]
pub struct CorrelationIdLayer;

impl<S> Layer<S> for CorrelationIdLayer {
    type Service = CorrelationIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationIdMiddleware { inner }
    }
}

/// Correlation ID middleware service.
#[derive(Clone, Debug)]
pub struct CorrelationIdMiddleware<S> {
    inner: S,
}

impl<S> Service<Request> for CorrelationIdMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let correlation_id = req
            .headers()
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        req.extensions_mut().insert(correlation_id);

        let span = tracing::info_span!(
            "http_request",
            correlation_id = %correlation_id,
            method = %req.method(),
            path = %req.uri().path(),
        );

        let fut = span.in_scope(|| self.inner.call(req));

        Box::pin(async move {
            let mut response = fut.instrument(span).await?;

            if let Ok(value) = HeaderValue::from_str(&correlation_id.to_string()) {
                response.headers_mut().insert(CORRELATION_ID_HEADER, value);
            }

            Ok(response)
        })
    }
}

/// Login budget, keyed by client address.
pub async fn login_rate_limit<S, I, L>(
    State(state): State<AppState<S, I, L>>,
    request: Request,
    next: Next,
) -> Response
where
    S: CheckinStore,
    I: IdentityProvider + 'static,
    L: RateLimiter + 'static,
{
    enforce(&state, RateLimitTier::Login, request, next).await
}

/// Ticket issuance budget, keyed by client address.
pub async fn ticket_issue_rate_limit<S, I, L>(
    State(state): State<AppState<S, I, L>>,
    request: Request,
    next: Next,
) -> Response
where
    S: CheckinStore,
    I: IdentityProvider + 'static,
    L: RateLimiter + 'static,
{
    enforce(&state, RateLimitTier::TicketIssue, request, next).await
}

/// Scan budget shared by `verify` and `validate`, keyed by client address.
pub async fn ticket_validate_rate_limit<S, I, L>(
    State(state): State<AppState<S, I, L>>,
    request: Request,
    next: Next,
) -> Response
where
    S: CheckinStore,
    I: IdentityProvider + 'static,
    L: RateLimiter + 'static,
{
    enforce(&state, RateLimitTier::TicketValidate, request, next).await
}

async fn enforce<S, I, L>(
    state: &AppState<S, I, L>,
    tier: RateLimitTier,
    request: Request,
    next: Next,
) -> Response
where
    S: CheckinStore,
    I: IdentityProvider + 'static,
    L: RateLimiter + 'static,
{
    let ip = client_ip(
        request.headers(),
        request.extensions().get::<ConnectInfo<SocketAddr>>(),
        state.trusted_proxies(),
    );

    match state.limiter().check(tier, &ip.to_string()).await {
        Ok(()) => next.run(request).await,
        Err(err @ CheckinError::RateLimited { retry_after }) => {
            tracing::warn!(
                tier = %tier,
                client_ip = %ip,
                retry_after_secs = retry_after.as_secs(),
                "Rate limit exceeded"
            );
            metrics::record_rate_limited(tier);
            AppError::from(err).into_response()
        }
        Err(err) => {
            // Counter backend down: serve the request rather than lock out the door.
            tracing::error!(tier = %tier, error = %err, "Rate limiter unavailable");
            next.run(request).await
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, routing::get};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route(
                "/test",
                get(|req: Request| async move {
                    req.extensions()
                        .get::<Uuid>()
                        .map(ToString::to_string)
                        .unwrap_or_default()
                }),
            )
            .layer(correlation_id_layer())
    }

    fn header(response: &Response) -> String {
        response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn generates_id_when_missing() {
        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert!(Uuid::parse_str(&header(&response)).is_ok());
    }

    #[tokio::test]
    async fn preserves_id_from_request() {
        let id = Uuid::new_v4();
        let request = Request::builder()
            .uri("/test")
            .header(CORRELATION_ID_HEADER, id.to_string())
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(header(&response), id.to_string());
    }

    #[tokio::test]
    async fn handler_sees_same_id_as_response() {
        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();

        let response = app().oneshot(request).await.unwrap();
        let echoed = header(&response);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        assert_eq!(String::from_utf8(body.to_vec()).unwrap(), echoed);
    }

    #[tokio::test]
    async fn invalid_id_is_replaced() {
        let request = Request::builder()
            .uri("/test")
            .header(CORRELATION_ID_HEADER, "not-a-uuid")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert_ne!(header(&response), "not-a-uuid");
        assert!(Uuid::parse_str(&header(&response)).is_ok());
    }
}

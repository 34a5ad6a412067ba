//! Custom Axum extractors.
//!
//! - `ClientIp`: client address from the connection, or from
//!   `X-Forwarded-For` when running behind [`TrustedProxies`]
//! - `UserAgent`: `User-Agent` header, if present
//! - `ClientOrigin`: the two above, as the domain's [`RequestOrigin`]
//! - `ApiJson`: JSON body whose rejection is an `invalid_input` [`AppError`]
//! - `AuthenticatedPartner`: staff session from the cookie or a bearer token
//! - `AuthenticatedAttendee`: attendee resolved by the identity provider
//!
//! # Examples
//!
//! ```ignore
//! async fn handler(
//!     partner: AuthenticatedPartner,
//!     ClientOrigin(origin): ClientOrigin,
//!     ApiJson(body): ApiJson<ValidateRequest>,
//! ) -> Result<Json<ValidateResponse>, AppError> {
//!     tracing::info!(partner_id = %partner.account.id, ip = ?origin.ip_address, "Scan");
//!     Ok(Json(response))
//! }
//! ```

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    async_trait,
    extract::{ConnectInfo, FromRef, FromRequest, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use checkin_auth::providers::RateLimiter;
use checkin_core::error::{AuthError, CheckinError};
use checkin_core::providers::{CheckinStore, IdentityProvider};
use checkin_core::types::{PartnerAccount, RequestOrigin, UserId};
use std::convert::Infallible;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Number of reverse proxies in front of the server that append to
/// `X-Forwarded-For`.
///
/// Zero (the default) ignores forwarding headers entirely. With `n` hops the
/// client is the `n`-th address from the right, the one the outermost
/// trusted proxy saw. Entries further left are client-supplied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrustedProxies(pub usize);

/// Client IP address.
///
/// See [`client_ip`] for the resolution order.
#[derive(Debug, Clone, Copy)]
pub struct ClientIp(pub IpAddr);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
    TrustedProxies: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(client_ip(
            &parts.headers,
            parts.extensions.get(),
            TrustedProxies::from_ref(state),
        )))
    }
}

/// Resolve the client address of a request.
///
/// Without trusted proxies this is the connection's peer address. Behind
/// `n` trusted proxies it is the `n`-th `X-Forwarded-For` entry from the
/// right (the leftmost when the header is shorter), falling back to the
/// peer when the header is absent or unparseable. Loopback when no peer
/// address is known.
#[must_use]
pub fn client_ip(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
    proxies: TrustedProxies,
) -> IpAddr {
    let peer = connect_info.map(|ConnectInfo(addr)| addr.ip());

    let forwarded = if proxies.0 == 0 {
        None
    } else {
        let hops: Vec<&str> = headers
            .get_all(X_FORWARDED_FOR)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|hop| !hop.is_empty())
            .collect();
        let index = hops.len().saturating_sub(proxies.0);
        hops.get(index).and_then(|hop| hop.parse::<IpAddr>().ok())
    };

    forwarded
        .or(peer)
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

/// `User-Agent` header.
#[derive(Debug, Clone, Default)]
pub struct UserAgent(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for UserAgent
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(Self(user_agent))
    }
}

/// Where a request came from, as recorded on sessions and audit entries.
#[derive(Debug, Clone)]
pub struct ClientOrigin(pub RequestOrigin);

#[async_trait]
impl<S> FromRequestParts<S> for ClientOrigin
where
    S: Send + Sync,
    TrustedProxies: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ClientIp(ip) = ClientIp::from_request_parts(parts, state).await?;
        let UserAgent(user_agent) = UserAgent::from_request_parts(parts, state).await?;

        Ok(Self(RequestOrigin {
            ip_address: Some(ip),
            user_agent,
        }))
    }
}

/// JSON body; malformed bodies become `invalid_input`.
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// `Authorization: Bearer <token>` value, if present and non-empty.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// A staff partner with a live session.
///
/// The session cookie takes precedence over an `Authorization: Bearer`
/// header. An expired session also clears the cookie.
#[derive(Debug, Clone)]
pub struct AuthenticatedPartner {
    /// The partner's account.
    pub account: PartnerAccount,
    /// The presented session token.
    pub token: String,
}

#[async_trait]
impl<S, I, L> FromRequestParts<AppState<S, I, L>> for AuthenticatedPartner
where
    S: CheckinStore,
    I: IdentityProvider + 'static,
    L: RateLimiter + 'static,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S, I, L>,
    ) -> Result<Self, Self::Rejection> {
        let token = state
            .cookies()
            .read(&parts.headers)
            .or_else(|| bearer_token(&parts.headers))
            .ok_or(AuthError::InvalidToken)?;

        match state.auth().authenticate(&token).await {
            Ok(account) => Ok(Self { account, token }),
            Err(err) => {
                let expired = matches!(err, CheckinError::Auth(AuthError::SessionExpired));
                let mut app = AppError::from(err);
                if expired {
                    if let Some(clear) = state.cookies().clear_cookie() {
                        app = app.with_header(header::SET_COOKIE, clear);
                    }
                }
                Err(app)
            }
        }
    }
}

/// An attendee authenticated by their own access token.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedAttendee(pub UserId);

#[async_trait]
impl<S, I, L> FromRequestParts<AppState<S, I, L>> for AuthenticatedAttendee
where
    S: CheckinStore,
    I: IdentityProvider + 'static,
    L: RateLimiter + 'static,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S, I, L>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(AuthError::InvalidToken)?;
        let user_id = state.identity().authenticate_attendee(&token).await?;
        Ok(Self(user_id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    fn forwarded(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, value.parse().unwrap());
        headers.insert("X-Real-IP", "198.51.100.2".parse().unwrap());
        headers
    }

    fn peer() -> ConnectInfo<SocketAddr> {
        ConnectInfo(SocketAddr::from(([192, 0, 2, 10], 51_000)))
    }

    #[test]
    fn client_ip_ignores_forwarding_headers_without_trusted_proxies() {
        let headers = forwarded("203.0.113.7, 10.0.0.1");

        assert_eq!(
            client_ip(&headers, Some(&peer()), TrustedProxies::default()).to_string(),
            "192.0.2.10"
        );
        assert_eq!(
            client_ip(&headers, None, TrustedProxies(0)),
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        );
    }

    #[test]
    fn client_ip_counts_trusted_hops_from_the_right() {
        let headers = forwarded("10.9.0.1, 203.0.113.7, 10.0.0.1");

        assert_eq!(
            client_ip(&headers, Some(&peer()), TrustedProxies(1)).to_string(),
            "10.0.0.1"
        );
        assert_eq!(
            client_ip(&headers, Some(&peer()), TrustedProxies(2)).to_string(),
            "203.0.113.7"
        );
        // Fewer entries than hops: the leftmost one is all there is.
        assert_eq!(
            client_ip(&headers, Some(&peer()), TrustedProxies(5)).to_string(),
            "10.9.0.1"
        );
    }

    #[test]
    fn client_ip_spoofed_prefix_does_not_change_the_result() {
        let a = forwarded("10.9.0.1, 198.51.100.77");
        let b = forwarded("10.9.0.2, 198.51.100.77");

        assert_eq!(
            client_ip(&a, None, TrustedProxies(1)),
            client_ip(&b, None, TrustedProxies(1))
        );
    }

    #[test]
    fn client_ip_joins_repeated_forwarded_headers() {
        let mut headers = HeaderMap::new();
        headers.append(X_FORWARDED_FOR, "10.9.0.1".parse().unwrap());
        headers.append(X_FORWARDED_FOR, "198.51.100.77".parse().unwrap());

        assert_eq!(
            client_ip(&headers, None, TrustedProxies(1)).to_string(),
            "198.51.100.77"
        );
    }

    #[test]
    fn client_ip_falls_back_to_peer_when_header_is_unusable() {
        let headers = forwarded("garbage");
        assert_eq!(
            client_ip(&headers, Some(&peer()), TrustedProxies(1)).to_string(),
            "192.0.2.10"
        );
        assert_eq!(
            client_ip(&HeaderMap::new(), Some(&peer()), TrustedProxies(1)).to_string(),
            "192.0.2.10"
        );
    }

    #[tokio::test]
    async fn origin_collects_ip_and_user_agent() {
        let mut parts = parts(
            Request::builder()
                .header(X_FORWARDED_FOR, "203.0.113.7, 198.51.100.2")
                .header(header::USER_AGENT, "ScannerApp/2.1"),
        );

        let ClientOrigin(origin) = ClientOrigin::from_request_parts(&mut parts, &TrustedProxies(1))
            .await
            .unwrap();
        assert_eq!(origin.ip_address, Some("198.51.100.2".parse().unwrap()));
        assert_eq!(origin.user_agent.as_deref(), Some("ScannerApp/2.1"));
    }

    #[test]
    fn bearer_token_requires_scheme_and_value() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, "Bearer ".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, "Bearer abc.def".parse().unwrap());
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def"));
    }
}

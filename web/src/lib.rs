//! HTTP surface of the check-in gateway.
//!
//! Thin Axum shell around the domain services in `checkin-core` and
//! `checkin-auth`: handlers extract, call one service method and map the
//! result. Business rules live in the services, not here.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              Axum shell                 │  ← JSON, cookies, CORS
//! │  - extractors (session, attendee, IP)   │  ← rate limits, tracing
//! │  - AppError → {code, message}           │  ← metrics
//! ├─────────────────────────────────────────┤
//! │          Domain services                │
//! │  - PartnerAuthService                   │
//! │  - TicketIssuer / CheckinValidator      │
//! │  - StaffConsole                         │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! let state = AppState::new(store, identity, limiter, StateConfig::new(b"s1", b"s2"), clock);
//! let app = build_router(state, cors_layer(HeaderValue::from_static("https://staff.example")));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cookies;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod router;
pub mod state;

pub use cookies::CookieConfig;
pub use error::AppError;
pub use extractors::{
    ApiJson, AuthenticatedAttendee, AuthenticatedPartner, ClientIp, ClientOrigin, TrustedProxies,
    UserAgent,
};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};
pub use router::{build_router, cors_layer};
pub use state::{AppState, StateConfig};

//! Error types for web handlers.
//!
//! [`AppError`] bridges [`CheckinError`] and HTTP responses. Every response
//! body has the shape `{"code": <kind>, "message": <text>}` where `code` is
//! the stable kind from the domain error.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use checkin_core::error::{AuthError, CheckinError, ValidationError};
use serde::Serialize;
use std::fmt;

/// Application error type for HTTP handlers.
///
/// # Example
///
/// ```
/// use axum::http::StatusCode;
/// use checkin_core::error::ValidationError;
/// use checkin_web::AppError;
///
/// let err = AppError::from(ValidationError::AlreadyRedeemed);
/// assert_eq!(err.status(), StatusCode::CONFLICT);
/// assert_eq!(err.code(), "already_redeemed");
/// ```
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    code: String,
    headers: HeaderMap,
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: code.into(),
            headers: HeaderMap::new(),
            source: None,
        }
    }

    /// Attach the underlying cause, logged for server errors.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Add a response header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// 400 with kind `invalid_input`.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_input", message)
    }

    /// 500 with a generic message.
    #[must_use]
    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal",
            "An internal error occurred",
        )
    }

    /// HTTP status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable kind.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Status code for a domain error kind.
const fn status_for(err: &CheckinError) -> StatusCode {
    match err {
        CheckinError::Auth(
            AuthError::InvalidCredentials | AuthError::InvalidToken | AuthError::SessionExpired,
        ) => StatusCode::UNAUTHORIZED,
        CheckinError::Auth(AuthError::ForbiddenAccountType)
        | CheckinError::Validation(ValidationError::NotOwner | ValidationError::ForeignActivity) => {
            StatusCode::FORBIDDEN
        }
        CheckinError::Validation(
            ValidationError::TicketNotFound
            | ValidationError::ParticipantNotFound
            | ValidationError::SlotNotFound,
        ) => StatusCode::NOT_FOUND,
        CheckinError::Validation(ValidationError::AlreadyRedeemed) => StatusCode::CONFLICT,
        CheckinError::Validation(
            ValidationError::TicketExpired
            | ValidationError::OutsideWindow
            | ValidationError::SlotFinished,
        ) => StatusCode::UNPROCESSABLE_ENTITY,
        CheckinError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        CheckinError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        CheckinError::Store(_)
        | CheckinError::Identity(_)
        | CheckinError::Crypto(_)
        | CheckinError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<CheckinError> for AppError {
    fn from(err: CheckinError) -> Self {
        if err.is_internal() {
            return Self::internal().with_source(anyhow::Error::new(err));
        }

        let mut app = Self::new(status_for(&err), err.kind(), err.to_string());
        if let CheckinError::RateLimited { retry_after } = err {
            // Whole seconds, never zero.
            let seconds = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            app = app
                .with_header(header::RETRY_AFTER, HeaderValue::from(seconds.max(1)))
                .with_message("Too many requests, please try again later");
        }
        app
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        CheckinError::from(err).into()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        CheckinError::from(err).into()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid_input(rejection.body_text())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal().with_source(err)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            match &self.source {
                Some(source) => tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    error = %source,
                    "Internal server error"
                ),
                None => tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    "Internal server error"
                ),
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        (self.status, self.headers, Json(body)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn display_includes_code() {
        let err = AppError::invalid_input("email is required");
        assert_eq!(err.to_string(), "[invalid_input] email is required");
    }

    #[test]
    fn domain_kinds_map_to_statuses() {
        let cases: [(CheckinError, StatusCode); 15] = [
            (AuthError::InvalidCredentials.into(), StatusCode::UNAUTHORIZED),
            (AuthError::InvalidToken.into(), StatusCode::UNAUTHORIZED),
            (AuthError::SessionExpired.into(), StatusCode::UNAUTHORIZED),
            (AuthError::ForbiddenAccountType.into(), StatusCode::FORBIDDEN),
            (ValidationError::NotOwner.into(), StatusCode::FORBIDDEN),
            (ValidationError::ForeignActivity.into(), StatusCode::FORBIDDEN),
            (ValidationError::TicketNotFound.into(), StatusCode::NOT_FOUND),
            (ValidationError::ParticipantNotFound.into(), StatusCode::NOT_FOUND),
            (ValidationError::SlotNotFound.into(), StatusCode::NOT_FOUND),
            (ValidationError::AlreadyRedeemed.into(), StatusCode::CONFLICT),
            (ValidationError::TicketExpired.into(), StatusCode::UNPROCESSABLE_ENTITY),
            (ValidationError::OutsideWindow.into(), StatusCode::UNPROCESSABLE_ENTITY),
            (ValidationError::SlotFinished.into(), StatusCode::UNPROCESSABLE_ENTITY),
            (CheckinError::InvalidInput("bad date".into()), StatusCode::BAD_REQUEST),
            (
                CheckinError::RateLimited {
                    retry_after: Duration::from_secs(60),
                },
                StatusCode::TOO_MANY_REQUESTS,
            ),
        ];

        for (err, status) in cases {
            let kind = err.kind();
            let app = AppError::from(err);
            assert_eq!(app.status(), status, "{kind}");
            assert_eq!(app.code(), kind);
        }
    }

    #[test]
    fn internal_errors_hide_details() {
        let app = AppError::from(CheckinError::Store("connection refused to 10.0.0.3".into()));
        assert_eq!(app.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(app.code(), "internal");
        assert!(!app.message().contains("10.0.0.3"));
    }

    #[test]
    fn rate_limited_sets_retry_after_rounded_up() {
        let app = AppError::from(CheckinError::RateLimited {
            retry_after: Duration::from_millis(1_500),
        });
        let response = app.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "2");
    }
}

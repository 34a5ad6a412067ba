//! Partner session cookie.
//!
//! The cookie is always `HttpOnly; SameSite=Strict; Path=/`. `Secure` is set
//! everywhere except local development.

use axum::http::{HeaderMap, HeaderValue, header};
use chrono::Duration;

/// How the session cookie is written.
#[derive(Debug, Clone)]
pub struct CookieConfig {
    /// Cookie name.
    ///
    /// Default: `partner_session`
    pub name: String,

    /// Whether to mark the cookie `Secure`.
    ///
    /// Default: `true`
    pub secure: bool,

    /// `Max-Age` of a freshly issued cookie.
    ///
    /// Default: 12 hours
    pub max_age: Duration,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: "partner_session".to_string(),
            secure: true,
            max_age: Duration::hours(12),
        }
    }
}

impl CookieConfig {
    /// Set the cookie name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the `Secure` flag.
    #[must_use]
    pub const fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Set `Max-Age`.
    #[must_use]
    pub const fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// `Set-Cookie` value carrying `token`.
    ///
    /// Returns `None` if the token contains bytes not allowed in a header.
    #[must_use]
    pub fn session_cookie(&self, token: &str) -> Option<HeaderValue> {
        self.render(token, self.max_age.num_seconds())
    }

    /// `Set-Cookie` value that removes the cookie.
    #[must_use]
    pub fn clear_cookie(&self) -> Option<HeaderValue> {
        self.render("", 0)
    }

    /// The session token from the request's `Cookie` headers, if any.
    #[must_use]
    pub fn read(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.name)
            .map(|(_, value)| value.trim_matches('"').to_string())
            .filter(|value| !value.is_empty())
    }

    fn render(&self, value: &str, max_age: i64) -> Option<HeaderValue> {
        let secure = if self.secure { "; Secure" } else { "" };
        let cookie = format!(
            "{}={value}; HttpOnly; SameSite=Strict; Path=/; Max-Age={max_age}{secure}",
            self.name
        );
        HeaderValue::from_str(&cookie).ok()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_attributes() {
        let cookie = CookieConfig::default().session_cookie("abc.def").unwrap();
        assert_eq!(
            cookie,
            "partner_session=abc.def; HttpOnly; SameSite=Strict; Path=/; Max-Age=43200; Secure"
        );
    }

    #[test]
    fn development_cookie_is_not_secure() {
        let cookie = CookieConfig::default()
            .with_secure(false)
            .clear_cookie()
            .unwrap();
        assert_eq!(
            cookie,
            "partner_session=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0"
        );
    }

    #[test]
    fn reads_named_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(
            header::COOKIE,
            HeaderValue::from_static("lang=fr; partner_session=tok123; other=1"),
        );

        let config = CookieConfig::default();
        assert_eq!(config.read(&headers).as_deref(), Some("tok123"));

        let renamed = config.with_name("staff");
        assert_eq!(renamed.read(&headers), None);
    }

    #[test]
    fn empty_cookie_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("partner_session="));
        assert_eq!(CookieConfig::default().read(&headers), None);
    }
}

//! Configuration management for the check-in server.
//!
//! Loads configuration from environment variables (after `.env`, if any).
//! Secrets and upstream addresses are required; everything else has a
//! default.

use chrono_tz::Tz;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed.
    #[error("invalid value for {var}: {value:?}")]
    Invalid {
        /// Variable name.
        var: &'static str,
        /// Offending value.
        value: String,
    },

    /// Session and ticket tokens must be signed with different secrets.
    #[error("PARTNER_SESSION_SECRET and CHECKIN_TICKET_SECRET must differ")]
    SharedSecret,
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    /// Local development: cookies are not marked `Secure`.
    Development,
    /// Anything else.
    Production,
}

impl AppEnv {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("development") {
            Self::Development
        } else {
            Self::Production
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listener and process settings.
    pub server: ServerConfig,
    /// `PostgreSQL` connection.
    pub database: DatabaseConfig,
    /// Signing secrets, CORS and venue time zone.
    pub auth: AuthConfig,
    /// Rate-limit counter backend.
    pub rate_limit: RateLimitConfig,
    /// Identity provider endpoint.
    pub identity: IdentityConfig,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// HTTP port.
    pub port: u16,
    /// Prometheus scrape port.
    pub metrics_port: u16,
    /// Deployment environment.
    pub environment: AppEnv,
    /// How long in-flight requests get after a shutdown signal.
    pub shutdown_timeout: Duration,
    /// Reverse proxies in front of the server that append to
    /// `X-Forwarded-For`. Zero keys clients by the socket peer.
    pub trusted_proxy_hops: usize,
}

/// `PostgreSQL` configuration.
#[derive(Clone)]
pub struct DatabaseConfig {
    /// Connection URL.
    pub url: String,
    /// Pool size.
    pub max_connections: u32,
}

/// Authentication configuration.
#[derive(Clone)]
pub struct AuthConfig {
    /// Signs partner session tokens.
    pub session_secret: String,
    /// Signs check-in tickets.
    pub ticket_secret: String,
    /// The staff console's origin, the only one allowed by CORS.
    pub cors_origin: String,
    /// Civil time zone of slot dates and times.
    pub timezone: Tz,
}

/// Rate-limit backend configuration.
#[derive(Clone, Default)]
pub struct RateLimitConfig {
    /// Shared Redis counters; in-process counters when unset.
    pub redis_url: Option<String>,
}

/// Identity provider configuration.
#[derive(Clone)]
pub struct IdentityConfig {
    /// Base URL of the GoTrue-compatible auth service.
    pub url: String,
    /// API key sent with every request.
    pub api_key: String,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing, a value
    /// does not parse, or the two signing secrets are equal.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`Config::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let session_secret = vars.required("PARTNER_SESSION_SECRET")?;
        let ticket_secret = vars.required("CHECKIN_TICKET_SECRET")?;
        if session_secret == ticket_secret {
            return Err(ConfigError::SharedSecret);
        }

        Ok(Self {
            server: ServerConfig {
                host: vars.or("HOST", "0.0.0.0"),
                port: vars.parsed("PORT", 3500)?,
                metrics_port: vars.parsed("METRICS_PORT", 9090)?,
                environment: AppEnv::parse(&vars.or("APP_ENV", "production")),
                shutdown_timeout: Duration::from_secs(vars.parsed("SHUTDOWN_TIMEOUT", 30)?),
                trusted_proxy_hops: vars.parsed("TRUSTED_PROXY_HOPS", 0)?,
            },
            database: DatabaseConfig {
                url: vars.required("DATABASE_URL")?,
                max_connections: vars.parsed("DATABASE_MAX_CONNECTIONS", 10)?,
            },
            auth: AuthConfig {
                session_secret,
                ticket_secret,
                cors_origin: vars.required("CORS_ORIGIN")?,
                timezone: vars.parsed("CHECKIN_TIMEZONE", chrono_tz::Europe::Paris)?,
            },
            rate_limit: RateLimitConfig {
                redis_url: vars.optional("RATE_LIMIT_REDIS_URL"),
            },
            identity: IdentityConfig {
                url: vars.required("IDENTITY_URL")?,
                api_key: vars.required("IDENTITY_API_KEY")?,
            },
        })
    }

    /// Whether the session cookie gets the `Secure` flag.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.server.environment != AppEnv::Development
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.optional(key).ok_or(ConfigError::Missing(key))
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T: std::str::FromStr>(&self, key: &'static str, default: T) -> Result<T, ConfigError> {
        match self.optional(key) {
            None => Ok(default),
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::Invalid { var: key, value }),
        }
    }
}

// Secrets stay out of logs.
impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("session_secret", &"<redacted>")
            .field("ticket_secret", &"<redacted>")
            .field("cors_origin", &self.cors_origin)
            .field("timezone", &self.timezone)
            .finish()
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let host = self.url.rsplit('@').next().unwrap_or_default();
        f.debug_struct("DatabaseConfig")
            .field("host", &host)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl fmt::Debug for RateLimitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let backend = if self.redis_url.is_some() { "redis" } else { "memory" };
        f.debug_struct("RateLimitConfig")
            .field("backend", &backend)
            .finish()
    }
}

impl fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn required() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("PARTNER_SESSION_SECRET", "session-secret"),
            ("CHECKIN_TICKET_SECRET", "ticket-secret"),
            ("CORS_ORIGIN", "https://staff.example"),
            ("DATABASE_URL", "postgres://app:pw@db.internal:5432/checkin"),
            ("IDENTITY_URL", "https://auth.example"),
            ("IDENTITY_API_KEY", "anon-key"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> Result<Config, ConfigError> {
        Config::from_lookup(|key| vars.get(key).map(|v| (*v).to_string()))
    }

    #[test]
    fn defaults_apply() {
        let config = load(&required()).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3500);
        assert_eq!(config.server.metrics_port, 9090);
        assert_eq!(config.server.shutdown_timeout, Duration::from_secs(30));
        assert_eq!(config.server.environment, AppEnv::Production);
        assert_eq!(config.server.trusted_proxy_hops, 0);
        assert!(config.secure_cookies());
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.auth.timezone, chrono_tz::Europe::Paris);
        assert!(config.rate_limit.redis_url.is_none());
    }

    #[test]
    fn each_required_variable_is_enforced() {
        for key in required().into_keys() {
            let mut vars = required();
            vars.insert(key, "  ");
            assert_eq!(load(&vars).unwrap_err(), ConfigError::Missing(key));
        }
    }

    #[test]
    fn secrets_must_differ() {
        let mut vars = required();
        vars.insert("CHECKIN_TICKET_SECRET", "session-secret");
        assert_eq!(load(&vars).unwrap_err(), ConfigError::SharedSecret);
    }

    #[test]
    fn development_disables_secure_cookies() {
        let mut vars = required();
        vars.insert("APP_ENV", "development");
        assert!(!load(&vars).unwrap().secure_cookies());
    }

    #[test]
    fn overrides_are_parsed() {
        let mut vars = required();
        vars.insert("PORT", "8080");
        vars.insert("TRUSTED_PROXY_HOPS", "1");
        vars.insert("CHECKIN_TIMEZONE", "America/Montreal");
        vars.insert("RATE_LIMIT_REDIS_URL", "redis://cache:6379");
        let config = load(&vars).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.trusted_proxy_hops, 1);
        assert_eq!(config.auth.timezone, chrono_tz::America::Montreal);
        assert_eq!(
            config.rate_limit.redis_url.as_deref(),
            Some("redis://cache:6379")
        );
    }

    #[test]
    fn unparseable_values_are_rejected() {
        let mut vars = required();
        vars.insert("CHECKIN_TIMEZONE", "Mars/Olympus");
        assert!(matches!(
            load(&vars).unwrap_err(),
            ConfigError::Invalid {
                var: "CHECKIN_TIMEZONE",
                ..
            }
        ));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = load(&required()).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("session-secret"));
        assert!(!debug.contains("anon-key"));
        assert!(!debug.contains("pw@"));
    }
}

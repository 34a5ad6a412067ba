//! Service wiring and the HTTP serve loop.

use crate::config::{Config, ConfigError};
use anyhow::Context;
use axum::http::HeaderValue;
use checkin_auth::providers::{GoTrueIdentityProvider, RateLimiter};
use checkin_auth::stores::{FixedWindowRateLimiter, RedisRateLimiter};
use checkin_core::{CheckinWindowCalculator, Clock, SystemClock};
use checkin_postgres::PostgresCheckinStore;
use checkin_web::{AppState, StateConfig, TrustedProxies, build_router, cors_layer};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::Notify;
use tracing::{error, info, warn};

/// Connect the backends and serve until a shutdown signal.
///
/// # Errors
///
/// Returns an error if a backend is unreachable, migrations fail, the
/// listener cannot bind, or the server stops abnormally.
pub async fn run(config: Config) -> anyhow::Result<()> {
    info!("Connecting to database...");
    let store =
        PostgresCheckinStore::connect(&config.database.url, config.database.max_connections)
            .await?;
    store.migrate().await?;
    store.ping().await?;
    info!("Database ready");

    let identity = GoTrueIdentityProvider::new(&config.identity.url, &config.identity.api_key)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    match config.rate_limit.redis_url.as_deref() {
        Some(url) => {
            info!("Using Redis rate-limit counters");
            let limiter = RedisRateLimiter::new(url).await?;
            serve(&config, store, identity, limiter, clock).await
        }
        None => {
            warn!("RATE_LIMIT_REDIS_URL unset, rate limits are per process");
            let limiter = FixedWindowRateLimiter::new(Arc::clone(&clock));
            serve(&config, store, identity, limiter, clock).await
        }
    }
}

/// Service configuration and CORS origin derived from `config`.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] if `CORS_ORIGIN` is not a valid header
/// value.
pub fn state_config(config: &Config) -> Result<(StateConfig, HeaderValue), ConfigError> {
    let mut state = StateConfig::new(
        config.auth.session_secret.as_bytes(),
        config.auth.ticket_secret.as_bytes(),
    );
    state.calculator = CheckinWindowCalculator::new(config.auth.timezone);
    state.cookies = state.cookies.with_secure(config.secure_cookies());
    state.trusted_proxies = TrustedProxies(config.server.trusted_proxy_hops);

    let origin =
        HeaderValue::from_str(&config.auth.cors_origin).map_err(|_| ConfigError::Invalid {
            var: "CORS_ORIGIN",
            value: config.auth.cors_origin.clone(),
        })?;
    Ok((state, origin))
}

async fn serve<L>(
    config: &Config,
    store: PostgresCheckinStore,
    identity: GoTrueIdentityProvider,
    limiter: L,
    clock: Arc<dyn Clock>,
) -> anyhow::Result<()>
where
    L: RateLimiter + 'static,
{
    let (state_config, origin) = state_config(config)?;
    let state = AppState::new(store, identity, limiter, state_config, clock);
    let app = build_router(state, cors_layer(origin));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Server listening");

    let stop = Arc::new(Notify::new());
    let stopped = Arc::clone(&stop);
    let mut server = tokio::spawn(
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move { stopped.notified().await })
        .into_future(),
    );

    tokio::select! {
        result = &mut server => {
            result.context("server task failed")??;
            return Ok(());
        }
        () = shutdown_signal() => {}
    }

    info!("Shutdown signal received, draining connections");
    stop.notify_one();
    drain(server, config.server.shutdown_timeout).await
}

async fn drain(
    server: tokio::task::JoinHandle<std::io::Result<()>>,
    timeout: Duration,
) -> anyhow::Result<()> {
    match tokio::time::timeout(timeout, server).await {
        Ok(result) => {
            result.context("server task failed")??;
            info!("Server stopped");
        }
        Err(_) => warn!(?timeout, "Connections still open after timeout, exiting"),
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

//! Logging and metrics bootstrap.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "info,checkin=debug,sqlx=warn";

/// Telemetry setup errors.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global subscriber was already set.
    #[error("failed to install tracing subscriber: {0}")]
    Tracing(String),

    /// The Prometheus exporter could not bind or install.
    #[error("failed to install Prometheus exporter: {0}")]
    Metrics(String),
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the default filter.
///
/// # Errors
///
/// Returns [`TelemetryError::Tracing`] if a subscriber is already installed.
pub fn init_tracing() -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| TelemetryError::Tracing(e.to_string()))
}

/// Serve Prometheus metrics on `addr` and register metric descriptions.
///
/// # Errors
///
/// Returns [`TelemetryError::Metrics`] if the listener or recorder cannot
/// be installed.
pub fn init_metrics(addr: SocketAddr) -> Result<(), TelemetryError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| TelemetryError::Metrics(e.to_string()))?;

    checkin_web::metrics::describe();
    tracing::info!(%addr, "Metrics available at http://{addr}/metrics");
    Ok(())
}

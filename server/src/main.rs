//! Check-in gateway HTTP server.

use checkin_server::{Config, run, telemetry};
use std::net::SocketAddr;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing .env is fine
    let _ = dotenvy::dotenv();
    telemetry::init_tracing()?;

    let config = Config::from_env()?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        environment = ?config.server.environment,
        timezone = %config.auth.timezone,
        "Configuration loaded"
    );

    let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.server.metrics_port));
    telemetry::init_metrics(metrics_addr)?;

    run(config).await
}

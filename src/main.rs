//! courierd - connection-oriented text message router.
//!
//! Clients register a name, exchange directed messages (queued while the
//! recipient is offline), and chat in rooms.

mod config;
mod error;
mod handlers;
mod http;
mod metrics;
mod network;
mod state;
mod telemetry;

use crate::config::{Config, validation};
use crate::network::Gateway;
use crate::state::Matrix;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    if let Err(errors) = validation::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        anyhow::bail!("{} configuration error(s) in {}", errors.len(), config_path);
    }

    info!(
        server = %config.server.name,
        listen = %config.listen.address,
        max_pending = config.limits.max_pending_per_recipient,
        "Starting courierd"
    );

    // Prometheus metrics are optional.
    // Convention: metrics_port = 0 disables the HTTP endpoint (used by tests).
    let metrics_port = config.server.metrics_port;
    if metrics_port == 0 {
        info!("Metrics disabled");
    } else {
        metrics::init();
        info!("Metrics initialized");

        tokio::spawn(async move {
            if let Err(e) = http::run_http_server(metrics_port).await {
                error!(port = metrics_port, error = %e, "Metrics endpoint failed");
            }
        });
    }

    let matrix = Arc::new(Matrix::new(&config));
    let gateway = Gateway::bind(config.listen.address, matrix).await?;
    info!(addr = %gateway.local_addr()?, "Accepting connections");

    tokio::select! {
        result = gateway.run() => result?,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Shutdown requested");
        }
    }

    Ok(())
}

//! Gateway - TCP listener that accepts incoming connections.
//!
//! The Gateway binds the client socket and spawns a Connection task for each
//! incoming client.

use crate::handlers::Registry;
use crate::network::Connection;
use crate::state::Matrix;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, instrument, warn};

/// First pause after a failed accept; doubles per consecutive failure.
const ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(10);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Pause before retrying after `failures` consecutive accept errors.
///
/// Errors such as EMFILE repeat until a descriptor frees up, so retrying
/// immediately would spin.
fn accept_backoff(failures: u32) -> Duration {
    let shift = failures.saturating_sub(1).min(16);
    ACCEPT_BACKOFF_MIN
        .saturating_mul(1 << shift)
        .min(ACCEPT_BACKOFF_MAX)
}

/// The Gateway accepts incoming TCP connections and spawns handlers.
pub struct Gateway {
    listener: TcpListener,
    matrix: Arc<Matrix>,
    registry: Arc<Registry>,
}

impl Gateway {
    /// Bind the gateway to the specified address.
    pub async fn bind(addr: SocketAddr, matrix: Arc<Matrix>) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let registry = Arc::new(Registry::new());
        info!(
            server = %matrix.server_info.name,
            addr = %listener.local_addr()?,
            "Listener bound"
        );

        Ok(Self {
            listener,
            matrix,
            registry,
        })
    }

    /// The address actually bound (useful with port 0).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the gateway, accepting connections forever.
    #[instrument(skip(self), name = "gateway")]
    pub async fn run(self) -> anyhow::Result<()> {
        let mut failures = 0u32;
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    failures = 0;
                    if let Err(e) = stream.set_nodelay(true) {
                        warn!(%addr, error = %e, "Failed to set TCP_NODELAY");
                    }

                    let session = self.matrix.session_ids.next();
                    info!(%addr, %session, "Connection accepted");

                    let connection = Connection::new(
                        session,
                        stream,
                        addr,
                        Arc::clone(&self.matrix),
                        Arc::clone(&self.registry),
                    );
                    tokio::spawn(connection.run());
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    let pause = accept_backoff(failures);
                    error!(error = %e, failures, pause_ms = pause.as_millis() as u64, "Failed to accept connection");
                    tokio::time::sleep(pause).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_backoff_doubles_then_caps() {
        assert_eq!(accept_backoff(1), Duration::from_millis(10));
        assert_eq!(accept_backoff(2), Duration::from_millis(20));
        assert_eq!(accept_backoff(4), Duration::from_millis(80));
        assert_eq!(accept_backoff(8), ACCEPT_BACKOFF_MAX);
        assert_eq!(accept_backoff(u32::MAX), ACCEPT_BACKOFF_MAX);
    }
}

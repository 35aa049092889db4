//! Test server management.
//!
//! Spawns and manages courierd instances for integration testing.

use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::sleep;

/// Tunables written into the generated config.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub max_pending_per_recipient: usize,
    pub max_line_length: usize,
    pub registration_timeout: u64,
    pub idle_timeout: u64,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            max_pending_per_recipient: 100,
            max_line_length: 4096,
            registration_timeout: 60,
            idle_timeout: 0,
        }
    }
}

/// A test server instance.
pub struct TestServer {
    child: Child,
    port: u16,
    // Held so the config file outlives the process.
    _data_dir: TempDir,
}

impl TestServer {
    /// Spawn a test server with default options.
    pub async fn spawn() -> anyhow::Result<Self> {
        Self::spawn_with(ServerOptions::default()).await
    }

    /// Spawn a test server with the given options on a free port.
    pub async fn spawn_with(options: ServerOptions) -> anyhow::Result<Self> {
        let port = free_port()?;
        let data_dir = tempfile::tempdir()?;

        let config_path = data_dir.path().join("config.toml");
        let config_content = format!(
            r#"
[server]
name = "test.courier"
metrics_port = 0

[server.idle_timeouts]
registration = {registration}
idle = {idle}

[listen]
address = "127.0.0.1:{port}"

[limits]
max_pending_per_recipient = {pending}
max_line_length = {line}
"#,
            registration = options.registration_timeout,
            idle = options.idle_timeout,
            pending = options.max_pending_per_recipient,
            line = options.max_line_length,
        );
        std::fs::write(&config_path, config_content)?;

        let child = Command::new(env!("CARGO_BIN_EXE_courierd"))
            .arg(&config_path)
            .env("RUST_LOG", "warn")
            .stdout(Stdio::null())
            .spawn()?;

        let server = Self {
            child,
            port,
            _data_dir: data_dir,
        };

        // Wait for server to start listening
        server.wait_until_ready().await?;

        Ok(server)
    }

    /// Wait until the server is accepting connections.
    async fn wait_until_ready(&self) -> anyhow::Result<()> {
        for _ in 0..50 {
            if tokio::net::TcpStream::connect(("127.0.0.1", self.port))
                .await
                .is_ok()
            {
                return Ok(());
            }
            sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("Server failed to start within 5 seconds")
    }

    /// Get the server address.
    pub fn address(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    /// Connect a client without registering.
    pub async fn connect(&self) -> anyhow::Result<super::client::TestClient> {
        super::client::TestClient::connect(&self.address()).await
    }

    /// Connect a client and register `name`.
    pub async fn register(&self, name: &str) -> anyhow::Result<super::client::TestClient> {
        let mut client = self.connect().await?;
        client.register(name).await?;
        Ok(client)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Ask the OS for a port that is free right now.
fn free_port() -> anyhow::Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

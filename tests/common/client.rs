//! Test client.
//!
//! Sends raw protocol lines and asserts on the lines the server sends back.

use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

/// A test client.
pub struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
}

impl TestClient {
    /// Connect to a test server.
    pub async fn connect(address: &str) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(address).await?;

        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
        })
    }

    /// Send one line; a `\n` terminator is appended.
    pub async fn send(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Send raw bytes as-is.
    #[allow(dead_code)]
    pub async fn send_bytes(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        self.writer.write_all(bytes).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Receive a single line from the server.
    pub async fn recv(&mut self) -> anyhow::Result<String> {
        self.recv_timeout(Duration::from_secs(5)).await
    }

    /// Receive a line with a timeout. Fails on EOF.
    pub async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<String> {
        let mut line = String::new();
        let n = timeout(dur, self.reader.read_line(&mut line)).await??;
        if n == 0 {
            anyhow::bail!("connection closed");
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Receive a line and assert it equals `expected`.
    pub async fn expect(&mut self, expected: &str) {
        let line = self.recv().await.expect("expected a line from server");
        assert_eq!(line, expected);
    }

    /// Assert nothing arrives within a short window.
    #[allow(dead_code)]
    pub async fn expect_silence(&mut self) {
        if let Ok(line) = self.recv_timeout(Duration::from_millis(200)).await {
            panic!("expected no output, got {line:?}");
        }
    }

    /// Wait until the server closes the connection.
    #[allow(dead_code)]
    pub async fn expect_closed(&mut self) {
        let mut line = String::new();
        let n = timeout(Duration::from_secs(5), self.reader.read_line(&mut line))
            .await
            .expect("server did not close the connection")
            .unwrap_or(0);
        assert_eq!(n, 0, "expected EOF, got {line:?}");
    }

    /// Register `name` and consume the welcome line.
    pub async fn register(&mut self, name: &str) -> anyhow::Result<()> {
        self.send(&format!("server:register {name}")).await?;
        let line = self.recv().await?;
        if line != format!("Welcome {name}!") {
            anyhow::bail!("Registration failed: {line}");
        }
        Ok(())
    }
}

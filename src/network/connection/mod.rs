//! Connection - Handles an individual client connection.
//!
//! Each Connection runs in its own Tokio task:
//!
//! ```text
//! Phase 1: Handshake (sequential reads until server:register succeeds)
//!    ↓
//! Phase 2: Event loop (tokio::select!)
//!    ┌──────────────────────────────────────────────────┐
//!    │  FramedRead ──▶ [Handlers] ──▶ replies ─┐        │
//!    │                                          ▼        │
//!    │  outgoing queue (other sessions) ──▶ FramedWrite  │
//!    └──────────────────────────────────────────────────┘
//!    ↓
//! Teardown: close outgoing queue, requeue unsent directed messages,
//!           leave room, release name
//! ```

mod error_handling;
mod event_loop;
mod handshake;

use crate::handlers::Registry;
use crate::state::{ConnectionHandle, Matrix, SessionId, UnregisteredState};
use courier_proto::{LineCodec, ProtocolError, Reply};
use futures_util::SinkExt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{info, instrument};

pub(super) type Reader = FramedRead<OwnedReadHalf, LineCodec>;
pub(super) type Writer = FramedWrite<OwnedWriteHalf, LineCodec>;

/// Borrowed per-connection context shared by both phases.
pub(super) struct ConnectionContext<'a> {
    pub matrix: &'a Arc<Matrix>,
    pub registry: &'a Registry,
    pub handle: &'a ConnectionHandle,
    pub addr: SocketAddr,
}

/// Write `replies` in order and flush once.
pub(super) async fn write_replies(writer: &mut Writer, replies: &[Reply]) -> Result<(), ProtocolError> {
    if replies.is_empty() {
        return Ok(());
    }
    for reply in replies {
        writer.feed(reply).await?;
    }
    SinkExt::<&Reply>::flush(writer).await
}

/// A client connection handler.
pub struct Connection {
    session: SessionId,
    addr: SocketAddr,
    stream: TcpStream,
    matrix: Arc<Matrix>,
    registry: Arc<Registry>,
}

impl Connection {
    pub fn new(
        session: SessionId,
        stream: TcpStream,
        addr: SocketAddr,
        matrix: Arc<Matrix>,
        registry: Arc<Registry>,
    ) -> Self {
        Self {
            session,
            addr,
            stream,
            matrix,
            registry,
        }
    }

    /// Run the connection until it closes, then release its state.
    #[instrument(skip(self), fields(session = %self.session, addr = %self.addr), name = "connection")]
    pub async fn run(self) {
        let limits = &self.matrix.limits;
        let (read_half, write_half) = self.stream.into_split();
        let mut reader = FramedRead::new(read_half, LineCodec::with_max_len(limits.max_line_length));
        let mut writer = FramedWrite::new(write_half, LineCodec::new());

        let (handle, mut outgoing) =
            ConnectionHandle::channel(self.session, limits.outgoing_queue_capacity);
        let conn = ConnectionContext {
            matrix: &self.matrix,
            registry: &self.registry,
            handle: &handle,
            addr: self.addr,
        };

        let mut unreg_state = UnregisteredState::new();
        let handshake =
            handshake::run_handshake_loop(&conn, &mut reader, &mut writer, &mut unreg_state).await;

        let mut reg_state = match unreg_state.try_register() {
            Ok(state) => state,
            Err(state) => {
                info!(
                    reason = ?handshake.err(),
                    waited_ms = state.connected_at.elapsed().as_millis() as u64,
                    "Closed before registration"
                );
                return;
            }
        };

        if let Err(exit) = handshake {
            // Bound in the registry, but the welcome never reached the client.
            self.matrix.reclaim_undelivered(&reg_state.name, &mut outgoing);
            self.matrix.teardown_session(&reg_state.name, self.session);
            info!(identity = %reg_state.name, reason = ?exit, "Closed during registration");
            return;
        }

        let exit = event_loop::run_event_loop(
            &conn,
            &mut reader,
            &mut writer,
            &mut outgoing,
            &mut reg_state,
        )
        .await;

        self.matrix.reclaim_undelivered(&reg_state.name, &mut outgoing);
        self.matrix.teardown_session(&reg_state.name, self.session);
        info!(
            identity = %reg_state.name,
            reason = ?exit,
            connected_secs = reg_state.registered_at.elapsed().as_secs(),
            "Session ended"
        );
    }
}

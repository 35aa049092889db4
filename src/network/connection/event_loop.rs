//! Phase 2: registered session loop.
//!
//! Multiplexes three sources with `tokio::select!`: inbound lines from the
//! client, replies other sessions queued on this connection's handle, and the
//! optional idle deadline. All socket writes happen here, so a forwarded
//! message never interleaves with a command reply.

use super::error_handling::{
    IDLE_TIMEOUT, INPUT_TOO_LONG, ReadErrorAction, classify_read_error, post_reg_parse_error,
    push_error_reply, record_transport_closed,
};
use super::{ConnectionContext, Reader, Writer, write_replies};
use crate::handlers::Context;
use crate::state::RegisteredState;
use courier_proto::{Command, CommandError, Inbound, Reply};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Why a registered session ended.
#[derive(Debug)]
pub enum LoopExit {
    /// Client sent `server:exit`.
    Exit,
    /// Client closed the connection or the read failed.
    Disconnected,
    /// Writing to the client failed.
    WriteError,
    /// Client sent bytes that are not a valid line.
    ProtocolError,
    /// Nothing received within the idle timeout.
    IdleTimeout,
}

/// Outcome of handling one inbound frame.
enum Step {
    Continue,
    Stop(LoopExit),
}

/// Run Phase 2 until the session ends.
pub async fn run_event_loop(
    conn: &ConnectionContext<'_>,
    reader: &mut Reader,
    writer: &mut Writer,
    outgoing: &mut mpsc::Receiver<Arc<Reply>>,
    state: &mut RegisteredState,
) -> LoopExit {
    let idle_secs = conn.matrix.server_info.idle_timeouts.idle;
    let idle = (idle_secs > 0).then(|| Duration::from_secs(idle_secs));

    loop {
        let idle_deadline = idle.map(|d| Instant::from_std(state.last_activity + d));

        tokio::select! {
            inbound = reader.next() => {
                match handle_inbound(conn, writer, state, inbound).await {
                    Step::Continue => {}
                    Step::Stop(exit) => return exit,
                }
            }
            Some(reply) = outgoing.recv() => {
                if let Err(e) = writer.send(reply.as_ref()).await {
                    debug!(error = %e, "Write failed");
                    record_transport_closed();
                    return LoopExit::WriteError;
                }
            }
            () = idle_expired(idle_deadline) => {
                info!(identity = %state.name, "Idle timeout");
                let _ = write_replies(writer, &[Reply::error(IDLE_TIMEOUT)]).await;
                return LoopExit::IdleTimeout;
            }
        }
    }
}

/// Resolves at `deadline`, or never if there is none.
async fn idle_expired(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn handle_inbound(
    conn: &ConnectionContext<'_>,
    writer: &mut Writer,
    state: &mut RegisteredState,
    inbound: Option<Result<Inbound, courier_proto::ProtocolError>>,
) -> Step {
    let line = match inbound {
        None => return Step::Stop(LoopExit::Disconnected),
        Some(Ok(Inbound::Line(line))) => line,
        Some(Ok(Inbound::TooLong { length })) => {
            state.touch();
            warn!(identity = %state.name, length, "Input line too long");
            if write_replies(writer, &[Reply::error(INPUT_TOO_LONG)]).await.is_err() {
                record_transport_closed();
                return Step::Stop(LoopExit::WriteError);
            }
            return Step::Continue;
        }
        Some(Err(e)) => {
            return match classify_read_error(&e) {
                ReadErrorAction::FatalProtocolError { error_msg } => {
                    warn!(identity = %state.name, error = %error_msg, "Protocol violation");
                    let _ = write_replies(writer, &[Reply::error(error_msg.as_str())]).await;
                    Step::Stop(LoopExit::ProtocolError)
                }
                ReadErrorAction::IoError => {
                    debug!(error = %e, "Read error");
                    record_transport_closed();
                    Step::Stop(LoopExit::Disconnected)
                }
            };
        }
    };

    state.touch();

    let mut replies = Vec::new();
    let result = match line.parse::<Command>() {
        Ok(cmd) => {
            let mut ctx = Context::new(conn.matrix, conn.handle, &mut *state, conn.addr, &mut replies);
            conn.registry.dispatch_post_reg(&mut ctx, &cmd).await
        }
        Err(CommandError::Empty) => return Step::Continue,
        Err(e) => Err(post_reg_parse_error(e)),
    };

    let quit = match result {
        Ok(()) => false,
        Err(ref e) => push_error_reply(e, &mut replies),
    };

    if write_replies(writer, &replies).await.is_err() {
        record_transport_closed();
        return Step::Stop(LoopExit::WriteError);
    }

    if quit {
        Step::Stop(LoopExit::Exit)
    } else {
        Step::Continue
    }
}

//! Phase 1: registration handshake.

use super::error_handling::{
    INPUT_TOO_LONG, REGISTRATION_TIMEOUT, ReadErrorAction, classify_read_error,
    pre_reg_parse_error, push_error_reply, record_transport_closed,
};
use super::{ConnectionContext, Reader, Writer, write_replies};
use crate::handlers::Context;
use crate::state::UnregisteredState;
use courier_proto::{Command, CommandError, Inbound, Reply};
use futures_util::StreamExt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Handshake exit condition.
#[derive(Debug)]
pub enum HandshakeExit {
    /// Client closed the connection or the read failed.
    Disconnected,
    /// No successful registration within the configured time.
    Timeout,
    /// Writing a reply failed.
    WriteError,
    /// Client sent bytes that are not a valid line.
    ProtocolError,
}

/// Run Phase 1: read lines until a name is registered.
///
/// On `Ok`, `state.name` is set and the welcome (plus any offline messages)
/// has been written.
pub async fn run_handshake_loop(
    conn: &ConnectionContext<'_>,
    reader: &mut Reader,
    writer: &mut Writer,
    state: &mut UnregisteredState,
) -> Result<(), HandshakeExit> {
    let timeout_secs = conn.matrix.server_info.idle_timeouts.registration;
    let deadline = (timeout_secs > 0).then(|| Instant::now() + Duration::from_secs(timeout_secs));

    loop {
        let next = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, reader.next()).await {
                Ok(next) => next,
                Err(_) => {
                    info!(session = %conn.handle.session(), "Registration timeout");
                    let _ = write_replies(writer, &[Reply::error(REGISTRATION_TIMEOUT)]).await;
                    return Err(HandshakeExit::Timeout);
                }
            },
            None => reader.next().await,
        };

        let line = match next {
            None => return Err(HandshakeExit::Disconnected),
            Some(Ok(Inbound::Line(line))) => line,
            Some(Ok(Inbound::TooLong { length })) => {
                warn!(length, "Input line too long");
                write_replies(writer, &[Reply::error(INPUT_TOO_LONG)])
                    .await
                    .map_err(|_| write_failed())?;
                continue;
            }
            Some(Err(e)) => match classify_read_error(&e) {
                ReadErrorAction::FatalProtocolError { error_msg } => {
                    warn!(error = %error_msg, "Protocol violation during handshake");
                    let _ = write_replies(writer, &[Reply::error(error_msg.as_str())]).await;
                    return Err(HandshakeExit::ProtocolError);
                }
                ReadErrorAction::IoError => {
                    debug!(error = %e, "Read error during handshake");
                    record_transport_closed();
                    return Err(HandshakeExit::Disconnected);
                }
            },
        };

        let mut replies = Vec::new();
        let result = match line.parse::<Command>() {
            Ok(cmd) => {
                let mut ctx = Context::new(conn.matrix, conn.handle, &mut *state, conn.addr, &mut replies);
                conn.registry.dispatch_pre_reg(&mut ctx, &cmd).await
            }
            Err(CommandError::Empty) => continue,
            Err(e) => Err(pre_reg_parse_error(e)),
        };
        if let Err(ref e) = result {
            push_error_reply(e, &mut replies);
        }

        write_replies(writer, &replies)
            .await
            .map_err(|_| write_failed())?;

        if state.can_register() {
            return Ok(());
        }
    }
}

fn write_failed() -> HandshakeExit {
    record_transport_closed();
    HandshakeExit::WriteError
}

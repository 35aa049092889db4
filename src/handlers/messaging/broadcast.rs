//! Free text: broadcast to the sender's room.

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{Context, PostRegHandler};
use crate::state::RegisteredState;
use async_trait::async_trait;
use courier_proto::Command;
use tracing::debug;

/// Handler for free text lines.
///
/// Delivery is best effort: members whose queue is full or closed are
/// skipped and the sender is not told.
pub struct BroadcastHandler;

#[async_trait]
impl PostRegHandler for BroadcastHandler {
    async fn handle(&self, ctx: &mut Context<'_, RegisteredState>, cmd: &Command) -> HandlerResult {
        let Command::Text(text) = cmd else {
            return Err(HandlerError::InvalidFormat);
        };

        // Free text outside a room matches no message form.
        let fanout = ctx
            .matrix
            .rooms
            .broadcast(&ctx.state.name, text)
            .map_err(|e| match e {
                HandlerError::NoRoom => HandlerError::InvalidFormat,
                other => other,
            })?;

        crate::metrics::record_fanout(fanout.delivered);
        if fanout.failed > 0 {
            crate::metrics::record_delivery_failures(fanout.failed);
        }
        debug!(
            sender = %ctx.state.name,
            room = %fanout.room,
            delivered = fanout.delivered,
            failed = fanout.failed,
            "Room broadcast"
        );

        Ok(())
    }
}

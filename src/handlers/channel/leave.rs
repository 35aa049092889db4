//! `server:leave` handler.

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{Context, PostRegHandler};
use crate::state::RegisteredState;
use async_trait::async_trait;
use courier_proto::{Command, Reply};
use tracing::info;

/// Handler for `server:leave`.
pub struct LeaveHandler;

#[async_trait]
impl PostRegHandler for LeaveHandler {
    async fn handle(&self, ctx: &mut Context<'_, RegisteredState>, _cmd: &Command) -> HandlerResult {
        let departure = ctx
            .matrix
            .rooms
            .leave(&ctx.state.name)
            .ok_or(HandlerError::NoRoom)?;

        info!(identity = %ctx.state.name, room = %departure.room, closed = departure.closed, "Left room");
        crate::metrics::set_active_rooms(ctx.matrix.rooms.len());

        ctx.reply(Reply::Left {
            room: departure.room,
        });
        Ok(())
    }
}

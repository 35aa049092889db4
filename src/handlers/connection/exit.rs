//! `server:exit` handler for terminating client sessions.

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{Context, PostRegHandler};
use crate::state::RegisteredState;
use async_trait::async_trait;
use courier_proto::{Command, Reply};
use tracing::info;

/// Handler for `server:exit`.
pub struct ExitHandler;

#[async_trait]
impl PostRegHandler for ExitHandler {
    async fn handle(&self, ctx: &mut Context<'_, RegisteredState>, _cmd: &Command) -> HandlerResult {
        info!(session = %ctx.session, identity = %ctx.state.name, "Client exit");
        ctx.reply(Reply::Goodbye);

        // Signal exit by returning Quit; the connection loop flushes and tears down
        Err(HandlerError::Quit)
    }
}

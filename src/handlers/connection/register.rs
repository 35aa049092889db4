//! `server:register` handler.

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::helpers::validate_display_name;
use crate::handlers::{Context, PostRegHandler, PreRegHandler};
use crate::state::{RegisteredState, UnregisteredState};
use async_trait::async_trait;
use courier_proto::{Command, Reply};
use tracing::debug;

/// Handler for `server:register <name>`.
///
/// Binds the name and delivers any messages queued while it was offline,
/// oldest first, right after the welcome line. A registered session that
/// sends it again gets `AlreadyRegistered`.
pub struct RegisterHandler;

#[async_trait]
impl PreRegHandler for RegisterHandler {
    async fn handle(
        &self,
        ctx: &mut Context<'_, UnregisteredState>,
        cmd: &Command,
    ) -> HandlerResult {
        let Command::Register(name) = cmd else {
            return Err(HandlerError::InvalidFormat);
        };

        validate_display_name(name, ctx.matrix.limits.max_name_length)?;
        let pending = ctx.matrix.register_session(name, ctx.handle.clone())?;

        ctx.state.name = Some(name.clone());
        ctx.reply(Reply::Welcome { name: name.clone() });

        if let Some(oldest) = pending.first() {
            debug!(
                session = %ctx.session,
                count = pending.len(),
                oldest = %oldest.queued_at,
                "Delivering offline messages"
            );
        }
        for message in pending {
            ctx.reply(message.into_reply());
        }

        Ok(())
    }
}

#[async_trait]
impl PostRegHandler for RegisterHandler {
    async fn handle(&self, ctx: &mut Context<'_, RegisteredState>, _cmd: &Command) -> HandlerResult {
        Err(HandlerError::AlreadyRegistered(ctx.state.name.clone()))
    }
}

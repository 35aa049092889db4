//! Command handler registry and dispatch.
//!
//! Dispatch is split by registration phase: before registration only the
//! handlers in `pre_reg_handlers` are reachable, everything else answers
//! `NotRegistered`.

use super::context::Context;
use super::traits::{PostRegHandler, PreRegHandler};
use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{
    channel::{JoinHandler, LeaveHandler},
    connection::{ExitHandler, RegisterHandler},
    messaging::{BroadcastHandler, DirectHandler},
    user_query::WhoHandler,
};
use crate::state::{RegisteredState, UnregisteredState};
use crate::telemetry::CommandTimer;
use courier_proto::Command;
use std::collections::HashMap;
use tracing::{Instrument, Level, debug, span};

/// Registry of command handlers.
pub struct Registry {
    pre_reg_handlers: HashMap<&'static str, Box<dyn PreRegHandler>>,
    post_reg_handlers: HashMap<&'static str, Box<dyn PostRegHandler>>,
}

impl Registry {
    /// Create a new registry with all handlers registered.
    pub fn new() -> Self {
        let mut pre_reg_handlers: HashMap<&'static str, Box<dyn PreRegHandler>> = HashMap::new();
        pre_reg_handlers.insert("REGISTER", Box::new(RegisterHandler));

        let mut post_reg_handlers: HashMap<&'static str, Box<dyn PostRegHandler>> =
            HashMap::new();

        // Connection handlers
        post_reg_handlers.insert("REGISTER", Box::new(RegisterHandler));
        post_reg_handlers.insert("EXIT", Box::new(ExitHandler));

        // Room handlers
        post_reg_handlers.insert("JOIN", Box::new(JoinHandler));
        post_reg_handlers.insert("LEAVE", Box::new(LeaveHandler));

        // Messaging handlers
        post_reg_handlers.insert("DIRECT", Box::new(DirectHandler));
        post_reg_handlers.insert("TEXT", Box::new(BroadcastHandler));

        // Query handlers
        post_reg_handlers.insert("WHO", Box::new(WhoHandler));

        Self {
            pre_reg_handlers,
            post_reg_handlers,
        }
    }

    /// Dispatch a command for a connection that has not registered yet.
    pub async fn dispatch_pre_reg(
        &self,
        ctx: &mut Context<'_, UnregisteredState>,
        cmd: &Command,
    ) -> HandlerResult {
        let cmd_name = cmd.name();
        let Some(handler) = self.pre_reg_handlers.get(cmd_name) else {
            let err = HandlerError::NotRegistered;
            record_error(cmd_name, &err);
            return Err(err);
        };

        let command_span = span!(
            Level::DEBUG,
            "command",
            command = cmd_name,
            session = %ctx.session,
            identity = ctx.identity(),
            remote_addr = %ctx.remote_addr,
        );

        let _timer = CommandTimer::new(cmd_name);
        let result = handler.handle(ctx, cmd).instrument(command_span).await;
        if let Err(ref e) = result {
            record_error(cmd_name, e);
        }
        result
    }

    /// Dispatch a command for a registered session.
    pub async fn dispatch_post_reg(
        &self,
        ctx: &mut Context<'_, RegisteredState>,
        cmd: &Command,
    ) -> HandlerResult {
        let cmd_name = cmd.name();
        let Some(handler) = self.post_reg_handlers.get(cmd_name) else {
            let err = HandlerError::UnknownCommand(cmd_name.to_ascii_lowercase());
            record_error(cmd_name, &err);
            return Err(err);
        };

        let command_span = span!(
            Level::DEBUG,
            "command",
            command = cmd_name,
            session = %ctx.session,
            identity = ctx.identity(),
        );

        let _timer = CommandTimer::new(cmd_name);
        let result = handler.handle(ctx, cmd).instrument(command_span).await;
        if let Err(ref e) = result {
            record_error(cmd_name, e);
        }
        result
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Record a command error for metrics and debug logging.
pub fn record_error(command: &str, err: &HandlerError) {
    crate::metrics::record_command_error(command, err.error_code());
    debug!(command = %command, error = %err, "Command error");
}

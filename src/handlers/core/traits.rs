//! State-aware handler traits for typestate protocol enforcement.
//!
//! - [`PreRegHandler`]: Commands valid before registration (REGISTER)
//! - [`PostRegHandler`]: Commands requiring registration (WHO, JOIN, ...)
//!
//! Post-registration handlers receive `Context<RegisteredState>`, so the
//! sender's name is a plain `String` and never has to be checked.

use super::context::Context;
use crate::error::HandlerResult;
use crate::state::{RegisteredState, UnregisteredState};
use async_trait::async_trait;
use courier_proto::Command;

/// Handler for commands accepted before registration.
#[async_trait]
pub trait PreRegHandler: Send + Sync {
    async fn handle(
        &self,
        ctx: &mut Context<'_, UnregisteredState>,
        cmd: &Command,
    ) -> HandlerResult;
}

/// Handler for commands that require a registered name.
#[async_trait]
pub trait PostRegHandler: Send + Sync {
    async fn handle(&self, ctx: &mut Context<'_, RegisteredState>, cmd: &Command)
    -> HandlerResult;
}

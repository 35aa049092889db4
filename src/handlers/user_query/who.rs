//! `server:who` handler for listing registered names.

use crate::error::HandlerResult;
use crate::handlers::{Context, PostRegHandler};
use crate::state::RegisteredState;
use async_trait::async_trait;
use courier_proto::{Command, Reply};

/// Handler for `server:who`.
///
/// Replies with a sorted snapshot of every registered name, the sender
/// included.
pub struct WhoHandler;

#[async_trait]
impl PostRegHandler for WhoHandler {
    async fn handle(&self, ctx: &mut Context<'_, RegisteredState>, _cmd: &Command) -> HandlerResult {
        let names = ctx.matrix.identities.list();
        ctx.reply(Reply::ActiveUsers(names));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::handlers::testing::Harness;

    #[tokio::test]
    async fn lists_sorted_names() {
        let harness = Harness::new();
        let mut carol = harness.register("carol").await;
        let _alice = harness.register("alice").await;

        let (_, replies) = harness.run_collect(&mut carol, "server:who").await;
        assert_eq!(replies, ["Active users: alice, carol"]);
    }
}

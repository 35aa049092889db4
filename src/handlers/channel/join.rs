//! `server:join` handler.

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::helpers::validate_room_name;
use crate::handlers::{Context, PostRegHandler};
use crate::state::{JoinOutcome, RegisteredState};
use async_trait::async_trait;
use courier_proto::{Command, Reply};
use tracing::{debug, info};

/// Handler for `server:join <room>`.
///
/// Switches rooms if the session is already in one. Joining the current room
/// changes nothing but is still confirmed.
pub struct JoinHandler;

#[async_trait]
impl PostRegHandler for JoinHandler {
    async fn handle(&self, ctx: &mut Context<'_, RegisteredState>, cmd: &Command) -> HandlerResult {
        let Command::Join(room) = cmd else {
            return Err(HandlerError::InvalidFormat);
        };
        validate_room_name(room, ctx.matrix.limits.max_name_length)?;

        let name = &ctx.state.name;
        match ctx.matrix.rooms.join(name, ctx.handle.clone(), room) {
            JoinOutcome::AlreadyMember => {
                debug!(identity = %name, room = %room, "Already in room");
            }
            JoinOutcome::Joined { left, created } => {
                if let Some(departure) = left {
                    info!(identity = %name, room = %departure.room, closed = departure.closed, "Left room");
                }
                info!(identity = %name, room = %room, created, "Joined room");
                crate::metrics::set_active_rooms(ctx.matrix.rooms.len());
            }
        }

        ctx.reply(Reply::Joined { room: room.clone() });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::handlers::testing::Harness;

    #[tokio::test]
    async fn join_confirms_and_announces() {
        let harness = Harness::new();
        let mut alice = harness.register("alice").await;
        let mut bob = harness.register("bob").await;

        let (_, replies) = harness.run_collect(&mut alice, "server:join lounge").await;
        assert_eq!(replies, ["Joined lounge"]);
        let (_, replies) = harness.run_collect(&mut bob, "server:join lounge").await;
        assert_eq!(replies, ["Joined lounge"]);

        assert_eq!(alice.inbox(), ["* bob joined lounge"]);
        assert!(bob.inbox().is_empty());
        assert_eq!(harness.matrix.rooms.members("lounge"), ["alice", "bob"]);
    }

    #[tokio::test]
    async fn rejoin_is_confirmed_without_notice() {
        let harness = Harness::new();
        let mut alice = harness.register("alice").await;
        let mut bob = harness.register("bob").await;
        harness.run(&mut alice, "server:join lounge").await.unwrap();
        harness.run(&mut bob, "server:join lounge").await.unwrap();
        alice.inbox();

        let (result, replies) = harness.run_collect(&mut bob, "server:join lounge").await;
        result.unwrap();
        assert_eq!(replies, ["Joined lounge"]);
        assert!(alice.inbox().is_empty());
    }

    #[tokio::test]
    async fn invalid_room_name_is_rejected() {
        let harness = Harness::new();
        let mut alice = harness.register("alice").await;

        let err = harness.run(&mut alice, "server:join a,b").await.unwrap_err();
        assert_eq!(err.to_reply().unwrap().to_string(), "ERROR:Invalid name: a,b");
        assert!(harness.matrix.rooms.is_empty());
    }

    #[tokio::test]
    async fn missing_room_argument() {
        let harness = Harness::new();
        let mut alice = harness.register("alice").await;

        let err = harness.run(&mut alice, "server:join").await.unwrap_err();
        assert_eq!(err.to_reply().unwrap().to_string(), "ERROR:Missing argument for join");
    }
}

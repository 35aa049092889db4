//! Directed messages: `<recipient>:<body>`.

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::helpers::validate_display_name;
use crate::handlers::{Context, PostRegHandler};
use crate::state::{RegisteredState, Routed};
use async_trait::async_trait;
use courier_proto::{Command, Reply};
use tracing::{info, warn};

/// Handler for directed messages.
///
/// Online recipients get `<sender>: <body>`. Offline recipients get the same
/// line when they next register, and the sender is told the message was saved.
pub struct DirectHandler;

#[async_trait]
impl PostRegHandler for DirectHandler {
    async fn handle(&self, ctx: &mut Context<'_, RegisteredState>, cmd: &Command) -> HandlerResult {
        let Command::Direct { recipient, body } = cmd else {
            return Err(HandlerError::InvalidFormat);
        };
        // A name that could never register would hold its queue forever.
        validate_display_name(recipient, ctx.matrix.limits.max_name_length)?;

        let routed = ctx
            .matrix
            .identities
            .route(&ctx.state.name, recipient, body, &ctx.matrix.mailbox);

        match routed {
            Ok(Routed::Delivered) => {
                crate::metrics::record_forwarded();
            }
            Ok(Routed::Queued { pending }) => {
                crate::metrics::record_offline_enqueued();
                info!(
                    sender = %ctx.state.name,
                    recipient = %recipient,
                    pending,
                    recipients = ctx.matrix.mailbox.recipients(),
                    "Queued offline message"
                );
                ctx.reply(Reply::Saved {
                    recipient: recipient.clone(),
                });
            }
            Err(e @ HandlerError::DeliveryFailed { .. }) => {
                crate::metrics::record_delivery_failures(1);
                warn!(sender = %ctx.state.name, error = %e, "Directed message not delivered");
                return Err(e);
            }
            Err(e) => return Err(e),
        }

        Ok(())
    }
}

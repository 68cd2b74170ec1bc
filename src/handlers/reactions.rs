//! Reaction and read-receipt handlers.
//!
//! Both broadcast deltas only - full message state is never re-broadcast,
//! which bounds payload size regardless of how annotated a message gets.

use super::{Context, Handler, require_registered};
use crate::error::{HandlerError, HandlerResult};
use crate::protocol::{ClientEvent, ServerEvent};
use crate::state::ReadOutcome;
use async_trait::async_trait;

/// Handler for the `reaction` event.
///
/// Last-write-wins per identity: a new reaction type from the same identity
/// replaces the prior one. A reaction to an evicted message is a normal
/// sender-only `messageNotFound`, never broadcast.
pub struct ReactionHandler;

#[async_trait]
impl Handler for ReactionHandler {
    async fn handle(&self, ctx: &mut Context<'_>, event: &ClientEvent) -> HandlerResult {
        let ClientEvent::Reaction {
            message_id,
            reaction_type,
        } = event
        else {
            return Err(HandlerError::Malformed("expected reaction".into()));
        };

        let sender = require_registered(ctx)?;
        let coordinator = ctx.coordinator;

        let room_id = coordinator
            .annotations
            .set_reaction(*message_id, sender.identity.clone(), reaction_type.clone())
            .await
            .ok_or(HandlerError::MessageNotFound(*message_id))?;

        coordinator
            .broadcast_to_room(
                &room_id,
                ServerEvent::ReactionChanged {
                    message_id: *message_id,
                    identity: sender.identity,
                    reaction_type: reaction_type.clone(),
                },
            )
            .await;
        Ok(())
    }
}

/// Handler for the `read` event.
///
/// Idempotent: the first read from an identity broadcasts a delta, repeats
/// are a silent no-op success.
pub struct ReadHandler;

#[async_trait]
impl Handler for ReadHandler {
    async fn handle(&self, ctx: &mut Context<'_>, event: &ClientEvent) -> HandlerResult {
        let ClientEvent::Read { message_id } = event else {
            return Err(HandlerError::Malformed("expected read".into()));
        };

        let sender = require_registered(ctx)?;
        let coordinator = ctx.coordinator;

        let (room_id, outcome) = coordinator
            .annotations
            .mark_read(*message_id, sender.identity.clone())
            .await
            .ok_or(HandlerError::MessageNotFound(*message_id))?;

        if outcome == ReadOutcome::AlreadyRead {
            return Ok(());
        }

        coordinator
            .broadcast_to_room(
                &room_id,
                ServerEvent::ReadReceiptAdded {
                    message_id: *message_id,
                    identity: sender.identity,
                },
            )
            .await;
        Ok(())
    }
}

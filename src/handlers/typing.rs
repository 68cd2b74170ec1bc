//! Typing handler - ephemeral typing indicators.

use super::{Context, Handler, require_registered};
use crate::error::{HandlerError, HandlerResult};
use crate::protocol::{ClientEvent, RoomId};
use async_trait::async_trait;

/// Handler for the `typing` event.
///
/// `isTyping: true` (re)starts the sender's expiry deadline for the room;
/// `false` clears it. Either way the room gets a fresh typers snapshot.
/// Expiry itself is handled by the background sweeper.
pub struct TypingHandler;

#[async_trait]
impl Handler for TypingHandler {
    async fn handle(&self, ctx: &mut Context<'_>, event: &ClientEvent) -> HandlerResult {
        let ClientEvent::Typing { is_typing, room } = event else {
            return Err(HandlerError::Malformed("expected typing".into()));
        };

        let sender = require_registered(ctx)?;
        let room_id = room.clone().unwrap_or_else(RoomId::public);

        let coordinator = ctx.coordinator;
        if !coordinator.rooms.contains(&room_id) {
            return Err(HandlerError::RoomNotFound(room_id.to_string()));
        }

        let changed = if *is_typing {
            coordinator
                .typing
                .set_typing(sender.identity.clone(), room_id.clone());
            true
        } else {
            coordinator.typing.clear_typing(&sender.identity, &room_id)
        };

        if changed {
            coordinator.broadcast_typing_snapshot(&room_id).await;
        }
        Ok(())
    }
}

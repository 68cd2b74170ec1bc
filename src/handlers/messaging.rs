//! Send handler - message routing and history append.

use super::{Context, Handler, require_registered};
use crate::error::{HandlerError, HandlerResult};
use crate::protocol::{ClientEvent, Identity, RoomId, RoomKind, ServerEvent};
use async_trait::async_trait;

/// Handler for the `send` event.
///
/// Resolves the target room by kind, appends to its ring history, treats
/// the send as an implicit stop-typing, and broadcasts the stored message
/// to the room's membership. Persistence is fire-and-forget off the
/// event-handling path.
pub struct SendHandler;

#[async_trait]
impl Handler for SendHandler {
    async fn handle(&self, ctx: &mut Context<'_>, event: &ClientEvent) -> HandlerResult {
        let ClientEvent::Send {
            content,
            room_kind,
            target,
        } = event
        else {
            return Err(HandlerError::Malformed("expected send".into()));
        };

        let sender = require_registered(ctx)?;
        if content.trim().is_empty() {
            return Err(HandlerError::EmptyMessage);
        }

        let coordinator = ctx.coordinator;
        let room_id = match room_kind {
            RoomKind::Public => RoomId::public(),
            RoomKind::Channel => {
                let id = target
                    .as_deref()
                    .ok_or_else(|| HandlerError::Malformed("channel send without target".into()))?;
                if !coordinator.rooms.is_channel(id) {
                    return Err(HandlerError::UnknownChannel(id.to_string()));
                }
                RoomId(id.to_string())
            }
            RoomKind::Private => {
                let other = target
                    .as_deref()
                    .map(Identity::from)
                    .ok_or_else(|| HandlerError::Malformed("private send without target".into()))?;
                let other_known = coordinator.registry.is_online(&other)
                    || coordinator.registry.last_seen(&other).is_some()
                    || other == sender.identity;
                if !other_known {
                    return Err(HandlerError::IdentityUnknown(other.to_string()));
                }
                let (room_id, _) = coordinator.rooms.ensure_private(&sender.identity, &other);
                // The sender's side of the pair attaches on first send, every
                // session included so other devices see the echo; the peer
                // attaches through its own joinPrivate.
                for connection in coordinator.registry.connections_for(&sender.identity) {
                    coordinator.rooms.join(&connection, &room_id).await;
                }
                room_id
            }
        };

        let message = coordinator
            .rooms
            .append(
                &room_id,
                sender.identity.clone(),
                sender.display_name.clone(),
                content.clone(),
            )
            .await
            .ok_or_else(|| HandlerError::RoomNotFound(room_id.to_string()))?;

        // Sending is an implicit stop-typing.
        if coordinator.typing.clear_typing(&sender.identity, &room_id) {
            coordinator.broadcast_typing_snapshot(&room_id).await;
        }

        // Fire-and-forget persistence: collaborator latency must not stall
        // broadcast of this or unrelated events.
        {
            let store = std::sync::Arc::clone(&coordinator.store);
            let stored = message.clone();
            tokio::spawn(async move {
                if let Err(e) = store.save(&stored).await {
                    tracing::warn!(message_id = stored.id, error = %e, "Persistence save failed");
                }
            });
        }

        coordinator
            .broadcast_to_room(&room_id, ServerEvent::NewMessage { message })
            .await;
        Ok(())
    }
}

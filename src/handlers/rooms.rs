//! Room join handlers - named channels and private pairs.

use super::{Context, Handler, history_for_sync, require_registered};
use crate::error::{HandlerError, HandlerResult};
use crate::protocol::{ClientEvent, RoomId, ServerEvent};
use async_trait::async_trait;
use tracing::debug;

/// Handler for the `joinChannel` event.
///
/// Channels are a static pre-declared set; anything else is an
/// `unknownChannel` error to the sender and a no-op.
pub struct JoinChannelHandler;

#[async_trait]
impl Handler for JoinChannelHandler {
    async fn handle(&self, ctx: &mut Context<'_>, event: &ClientEvent) -> HandlerResult {
        let ClientEvent::JoinChannel { channel_id } = event else {
            return Err(HandlerError::Malformed("expected joinChannel".into()));
        };

        let sender = require_registered(ctx)?;
        let coordinator = ctx.coordinator;
        if !coordinator.rooms.is_channel(channel_id) {
            return Err(HandlerError::UnknownChannel(channel_id.clone()));
        }

        let room_id = RoomId(channel_id.clone());
        coordinator
            .rooms
            .join(ctx.connection_id, &room_id)
            .await
            .ok_or_else(|| HandlerError::RoomNotFound(channel_id.clone()))?;

        let messages = history_for_sync(coordinator, &room_id).await;
        ctx.reply(ServerEvent::RoomHistory { room_id: room_id.clone(), messages })?;

        debug!(
            connection_id = %ctx.connection_id,
            identity = %sender.identity,
            channel = %room_id,
            "Joined channel"
        );
        Ok(())
    }
}

/// Handler for the `joinPrivate` event.
///
/// The pair room id is derived, never user-chosen, so both sides converge
/// on the same room and repeated joins are idempotent. The peer need not be
/// online, but must be known to the coordinator; membership is populated
/// lazily as each side joins. Every one of the sender's connections is
/// attached so multi-device sessions all receive the pair's traffic.
pub struct JoinPrivateHandler;

#[async_trait]
impl Handler for JoinPrivateHandler {
    async fn handle(&self, ctx: &mut Context<'_>, event: &ClientEvent) -> HandlerResult {
        let ClientEvent::JoinPrivate { other_identity } = event else {
            return Err(HandlerError::Malformed("expected joinPrivate".into()));
        };

        let sender = require_registered(ctx)?;
        let coordinator = ctx.coordinator;

        let other_known = coordinator.registry.is_online(other_identity)
            || coordinator.registry.last_seen(other_identity).is_some()
            || *other_identity == sender.identity;
        if !other_known {
            return Err(HandlerError::IdentityUnknown(other_identity.to_string()));
        }

        let (room_id, _) = coordinator
            .rooms
            .ensure_private(&sender.identity, other_identity);
        for connection in coordinator.registry.connections_for(&sender.identity) {
            coordinator.rooms.join(&connection, &room_id).await;
        }

        let messages = history_for_sync(coordinator, &room_id).await;
        ctx.reply(ServerEvent::RoomHistory { room_id: room_id.clone(), messages })?;
        crate::metrics::set_active_rooms(coordinator.rooms.room_count());

        debug!(
            connection_id = %ctx.connection_id,
            identity = %sender.identity,
            other = %other_identity,
            room = %room_id,
            "Joined private pair"
        );
        Ok(())
    }
}

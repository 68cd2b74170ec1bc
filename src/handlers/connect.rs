//! Connect handler - registration and initial sync.

use super::{Context, Handler, history_for_sync};
use crate::error::{HandlerError, HandlerResult};
use crate::metrics;
use crate::protocol::{ClientEvent, RoomId, ServerEvent};
use async_trait::async_trait;
use tracing::info;

/// Handler for the `connect` event.
///
/// Must be the first event on a connection. Verifies the credential with
/// the identity provider, registers the connection, auto-joins the public
/// room, replies with welcome + presence snapshot + public history, and
/// fans a presence change out to everyone.
pub struct ConnectHandler;

#[async_trait]
impl Handler for ConnectHandler {
    async fn handle(&self, ctx: &mut Context<'_>, event: &ClientEvent) -> HandlerResult {
        let ClientEvent::Connect {
            display_name,
            credential,
        } = event
        else {
            return Err(HandlerError::Malformed("expected connect".into()));
        };

        if ctx.session.registered() {
            return Err(HandlerError::AlreadyConnected);
        }

        let coordinator = ctx.coordinator;
        let identity = coordinator
            .auth
            .verify(credential.as_deref(), display_name)
            .await
            .map_err(|e| HandlerError::AuthRejected(e.to_string()))?;

        let was_offline = coordinator.registry.register(
            ctx.connection_id.clone(),
            identity.clone(),
            display_name.trim().to_string(),
        );
        coordinator.register_sender(ctx.connection_id, ctx.sender.clone());
        ctx.session.identity = Some(identity.clone());
        metrics::set_connected(coordinator.registry.connection_count());

        // Every connection lives in the public room.
        let public = RoomId::public();
        coordinator.rooms.join(ctx.connection_id, &public).await;

        let history = history_for_sync(coordinator, &public).await;
        ctx.reply(ServerEvent::Welcome {
            connection_id: ctx.connection_id.clone(),
            identity: identity.clone(),
        })?;
        ctx.reply(ServerEvent::PresenceSnapshot {
            online: coordinator.registry.list_online(),
        })?;
        ctx.reply(ServerEvent::RoomHistory {
            room_id: public,
            messages: history,
        })?;

        // Additional sessions of an already-online identity are not a
        // presence transition.
        if was_offline {
            coordinator.broadcast_to_all(ServerEvent::PresenceChanged {
                identity: identity.clone(),
                online: true,
                last_seen_at: None,
            });
        }
        metrics::set_active_rooms(coordinator.rooms.room_count());

        info!(
            connection_id = %ctx.connection_id,
            identity = %identity,
            display_name = %display_name,
            "Connection registered"
        );
        Ok(())
    }
}

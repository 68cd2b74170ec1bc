//! Presence status handler.

use super::{Context, Handler, require_registered};
use crate::error::{HandlerError, HandlerResult};
use crate::protocol::{ClientEvent, ServerEvent};
use async_trait::async_trait;

/// Handler for the `setStatus` event.
///
/// Flips this connection's entry between online and away (last write wins
/// per identity) and pushes a fresh presence snapshot to everyone.
pub struct SetStatusHandler;

#[async_trait]
impl Handler for SetStatusHandler {
    async fn handle(&self, ctx: &mut Context<'_>, event: &ClientEvent) -> HandlerResult {
        let ClientEvent::SetStatus { status } = event else {
            return Err(HandlerError::Malformed("expected setStatus".into()));
        };

        require_registered(ctx)?;
        let coordinator = ctx.coordinator;
        coordinator
            .registry
            .set_status(ctx.connection_id, *status)
            .ok_or(HandlerError::StaleConnection)?;

        coordinator.broadcast_to_all(ServerEvent::PresenceSnapshot {
            online: coordinator.registry.list_online(),
        });
        Ok(())
    }
}

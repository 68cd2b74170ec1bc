//! Inbound event handlers - the broadcast router.
//!
//! The router itself is stateless between events: each handler consults the
//! shared [`Coordinator`] components, commits the state mutation, then fans
//! the outbound events out. Per-event handling is isolated so one bad event
//! affects only its originating connection.

mod connect;
mod messaging;
mod reactions;
mod rooms;
mod status;
mod typing;

pub use connect::ConnectHandler;
pub use messaging::SendHandler;
pub use reactions::{ReactionHandler, ReadHandler};
pub use rooms::{JoinChannelHandler, JoinPrivateHandler};
pub use status::SetStatusHandler;
pub use typing::TypingHandler;

use crate::error::{HandlerError, HandlerResult};
use crate::metrics;
use crate::protocol::{ClientEvent, ConnectionId, Identity, Message, RoomId, ServerEvent};
use crate::state::{Connection, Coordinator};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Per-connection session state owned by the connection task.
///
/// Lives outside the shared state on purpose: it only ever says whether
/// this transport session has completed `connect`.
#[derive(Debug, Default)]
pub struct Session {
    /// Identity assigned at connect time; `None` until registered.
    pub identity: Option<Identity>,
}

impl Session {
    pub fn registered(&self) -> bool {
        self.identity.is_some()
    }
}

/// Handler context passed to each event handler.
pub struct Context<'a> {
    /// The originating connection.
    pub connection_id: &'a ConnectionId,
    /// Shared coordinator state.
    pub coordinator: &'a Arc<Coordinator>,
    /// Sender for events to this connection.
    pub sender: &'a mpsc::Sender<ServerEvent>,
    /// This connection's session state.
    pub session: &'a mut Session,
}

impl Context<'_> {
    /// Reply directly to the originating connection.
    ///
    /// Non-blocking: the connection task is inside this handler and cannot
    /// drain its own queue, so awaiting a full queue here would never wake.
    pub fn reply(&self, event: ServerEvent) -> Result<(), HandlerError> {
        self.sender
            .try_send(event)
            .map_err(|_| HandlerError::Backpressure)
    }
}

/// Resolve the sending connection, enforcing registration.
///
/// `NotConnected` before `connect`; `StaleConnection` when the registry no
/// longer knows the connection (a disconnect raced a trailing event) - the
/// caller drops the event silently.
pub fn require_registered(ctx: &Context<'_>) -> Result<Connection, HandlerError> {
    if !ctx.session.registered() {
        return Err(HandlerError::NotConnected);
    }
    ctx.coordinator
        .registry
        .resolve(ctx.connection_id)
        .ok_or(HandlerError::StaleConnection)
}

/// Fetch a room's history for an initial sync, warming a cold room from the
/// persistence collaborator when memory holds nothing.
pub async fn history_for_sync(coordinator: &Coordinator, room_id: &RoomId) -> Vec<Message> {
    let limit = coordinator.rooms.history_sync_limit();
    let history = coordinator.rooms.history(room_id, limit).await;
    if !history.is_empty() {
        return history;
    }
    match coordinator.store.load_history(room_id, limit).await {
        Ok(stored) if !stored.is_empty() => {
            coordinator.rooms.seed(room_id, stored).await;
            coordinator.rooms.history(room_id, limit).await
        }
        Ok(_) => Vec::new(),
        Err(e) => {
            tracing::warn!(room = %room_id, error = %e, "Cold history load failed");
            Vec::new()
        }
    }
}

/// Trait implemented by all event handlers.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, ctx: &mut Context<'_>, event: &ClientEvent) -> HandlerResult;
}

/// Registry of event handlers, keyed by event kind.
pub struct Registry {
    handlers: HashMap<&'static str, Box<dyn Handler>>,
}

impl Registry {
    /// Create a new registry with all handlers registered.
    pub fn new() -> Self {
        let mut handlers: HashMap<&'static str, Box<dyn Handler>> = HashMap::new();

        handlers.insert("connect", Box::new(ConnectHandler));
        handlers.insert("send", Box::new(SendHandler));
        handlers.insert("typing", Box::new(TypingHandler));
        handlers.insert("reaction", Box::new(ReactionHandler));
        handlers.insert("read", Box::new(ReadHandler));
        handlers.insert("joinPrivate", Box::new(JoinPrivateHandler));
        handlers.insert("joinChannel", Box::new(JoinChannelHandler));
        handlers.insert("setStatus", Box::new(SetStatusHandler));

        Self { handlers }
    }

    /// Dispatch an event to its handler.
    ///
    /// On handler error the sender-only error event (if any) is emitted
    /// here; the error is still returned so the connection loop can decide
    /// whether it is fatal.
    pub async fn dispatch(&self, ctx: &mut Context<'_>, event: &ClientEvent) -> HandlerResult {
        let kind = event.kind();
        metrics::record_event(kind);

        let handler = self
            .handlers
            .get(kind)
            .expect("every ClientEvent kind has a registered handler");

        match handler.handle(ctx, event).await {
            Ok(()) => Ok(()),
            Err(e) => {
                metrics::record_event_error(kind, e.error_code());
                tracing::debug!(
                    connection_id = %ctx.connection_id,
                    event = kind,
                    error = %e,
                    "Handler error"
                );
                if let Some(error_event) = e.to_error_event() {
                    // Best effort: the connection may already be gone.
                    let _ = ctx.sender.try_send(error_event);
                }
                Err(e)
            }
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

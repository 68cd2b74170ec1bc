//! State management module.
//!
//! Contains the Coordinator (shared coordinator state) and the components
//! it composes: connection registry, room directory, typing tracker and
//! annotation ledger.

mod annotations;
mod registry;
mod rooms;
mod typing;

pub use annotations::{AnnotationLedger, ReadOutcome};
pub use registry::{Connection, ConnectionRegistry};
pub use rooms::{Room, RoomDirectory, private_room_id};
pub use typing::TypingTracker;

use crate::auth::IdentityProvider;
use crate::config::Config;
use crate::metrics;
use crate::protocol::{ConnectionId, Identity, RoomId, ServerEvent};
use crate::store::PersistenceStore;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Central shared state container.
///
/// Every component behind an explicit interface with its own concurrency
/// discipline; no raw shared containers cross component boundaries. All
/// state is memory-resident - ephemeral transient state is accepted to be
/// lost on restart.
pub struct Coordinator {
    /// Who is online, keyed by connection id.
    pub registry: ConnectionRegistry,
    /// Rooms, membership and ring history.
    pub rooms: Arc<RoomDirectory>,
    /// Currently-typing pairs with self-expiry.
    pub typing: TypingTracker,
    /// Reaction / read-receipt operations on resident messages.
    pub annotations: AnnotationLedger,
    /// Connection id -> outgoing event sender, for routing.
    senders: DashMap<ConnectionId, mpsc::Sender<ServerEvent>>,
    /// Durable storage collaborator (fire-and-forget from the router).
    pub store: Arc<dyn PersistenceStore>,
    /// Identity issuance collaborator, consulted at connect time.
    pub auth: Arc<dyn IdentityProvider>,
    /// Coordinator name, for logging.
    pub server_name: String,
    /// Runtime limits from config.
    pub limits: crate::config::LimitsConfig,
}

impl Coordinator {
    pub fn new(
        config: &Config,
        store: Arc<dyn PersistenceStore>,
        auth: Arc<dyn IdentityProvider>,
    ) -> Self {
        let rooms = Arc::new(RoomDirectory::new(config.rooms.clone()));
        Self {
            registry: ConnectionRegistry::new(),
            rooms: Arc::clone(&rooms),
            typing: TypingTracker::new(Duration::from_millis(config.limits.typing_ttl_ms)),
            annotations: AnnotationLedger::new(rooms),
            senders: DashMap::new(),
            store,
            auth,
            server_name: config.server.name.clone(),
            limits: config.limits.clone(),
        }
    }

    /// Register a connection's event sender for routing.
    pub fn register_sender(&self, connection_id: &ConnectionId, sender: mpsc::Sender<ServerEvent>) {
        self.senders.insert(connection_id.clone(), sender);
    }

    /// Unregister a connection's event sender.
    pub fn unregister_sender(&self, connection_id: &ConnectionId) {
        self.senders.remove(connection_id);
    }

    /// Deliver one event to one connection.
    ///
    /// Non-blocking: a connection whose outgoing queue is full loses this
    /// event rather than stalling the caller. Returns whether the event was
    /// queued.
    pub fn send_to_connection(&self, connection_id: &ConnectionId, event: ServerEvent) -> bool {
        let Some(sender) = self.senders.get(connection_id) else {
            return false;
        };
        match sender.try_send(event) {
            Ok(()) => {
                metrics::inc_events_sent();
                true
            }
            Err(e) => {
                metrics::inc_events_dropped();
                tracing::debug!(connection_id = %connection_id, error = %e, "Outgoing queue full, event dropped");
                false
            }
        }
    }

    /// Fan one event out to a room's membership, the sender included.
    ///
    /// The member list is snapshotted under the room's read lock and the
    /// lock released before any delivery, so a stalled recipient cannot
    /// stall the room.
    pub async fn broadcast_to_room(&self, room_id: &RoomId, event: ServerEvent) {
        let members = self.rooms.membership(room_id).await;
        metrics::observe_fanout(members.len());
        for member in &members {
            self.send_to_connection(member, event.clone());
        }
    }

    /// Fan one event out to every live connection (presence changes).
    pub fn broadcast_to_all(&self, event: ServerEvent) {
        for entry in self.senders.iter() {
            let connection_id = entry.key().clone();
            self.send_to_connection(&connection_id, event.clone());
        }
    }

    /// Push a fresh typers snapshot to a room's membership.
    pub async fn broadcast_typing_snapshot(&self, room_id: &RoomId) {
        let event = ServerEvent::TypingSnapshot {
            room_id: room_id.clone(),
            typers: self.typing.current_typers(room_id),
        };
        self.broadcast_to_room(room_id, event).await;
    }

    /// Tear down a connection: registry, typing and membership cleanup plus
    /// the presence fan-out when the identity's last connection left.
    ///
    /// The canonical disconnect path, shared by transport close and fatal
    /// event errors. Safe to call for never-registered connections.
    pub async fn disconnect(&self, connection_id: &ConnectionId) {
        self.unregister_sender(connection_id);
        let Some((conn, last)) = self.registry.unregister(connection_id) else {
            return;
        };
        metrics::set_connected(self.registry.connection_count());

        let affected = self.typing.clear_all_for(&conn.identity);
        self.rooms.leave_all(connection_id).await;
        for room in affected {
            self.broadcast_typing_snapshot(&room).await;
        }

        if last {
            self.broadcast_to_all(ServerEvent::PresenceChanged {
                identity: conn.identity.clone(),
                online: false,
                last_seen_at: self.registry.last_seen(&conn.identity),
            });
        }
        tracing::info!(
            connection_id = %connection_id,
            identity = %conn.identity,
            last_session = last,
            "Connection unregistered"
        );
    }

    /// The identity a live connection belongs to, if any.
    pub fn identity_of(&self, connection_id: &ConnectionId) -> Option<Identity> {
        self.registry.resolve(connection_id).map(|c| c.identity)
    }
}

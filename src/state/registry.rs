//! ConnectionRegistry - single source of truth for who is online.
//!
//! One entry per live connection. An identity may own several connections
//! at once (multi-session); "is this identity online" means it has at least
//! one registered connection.

use crate::protocol::{ConnectionId, Identity, PresenceEntry, Status};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashSet;

/// One live transport session.
#[derive(Debug, Clone)]
pub struct Connection {
    pub connection_id: ConnectionId,
    pub identity: Identity,
    pub display_name: String,
    pub status: Status,
}

/// Registry of live connections, keyed by connection id with an identity
/// index for multi-session lookups.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, Connection>,
    by_identity: DashMap<Identity, HashSet<ConnectionId>>,
    last_seen: DashMap<Identity, DateTime<Utc>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection. Never evicts the identity's other sessions.
    ///
    /// Returns `true` if this made the identity online (it had no prior
    /// connection).
    pub fn register(
        &self,
        connection_id: ConnectionId,
        identity: Identity,
        display_name: String,
    ) -> bool {
        self.connections.insert(
            connection_id.clone(),
            Connection {
                connection_id: connection_id.clone(),
                identity: identity.clone(),
                display_name,
                status: Status::Online,
            },
        );
        self.last_seen.remove(&identity);
        let mut ids = self.by_identity.entry(identity).or_default();
        let was_offline = ids.is_empty();
        ids.insert(connection_id);
        was_offline
    }

    /// Remove a connection.
    ///
    /// Returns the removed entry and `true` if it was the identity's last
    /// connection, in which case the identity's `last_seen_at` is recorded.
    /// Unknown connection ids return `None` - a race between disconnect and
    /// a trailing event, never fatal.
    pub fn unregister(&self, connection_id: &ConnectionId) -> Option<(Connection, bool)> {
        let (_, conn) = self.connections.remove(connection_id)?;
        let mut last = false;
        if let Some(mut ids) = self.by_identity.get_mut(&conn.identity) {
            ids.remove(connection_id);
            last = ids.is_empty();
        }
        if last {
            self.by_identity.remove(&conn.identity);
            self.last_seen.insert(conn.identity.clone(), Utc::now());
        }
        Some((conn, last))
    }

    /// Look up a connection by id.
    pub fn resolve(&self, connection_id: &ConnectionId) -> Option<Connection> {
        self.connections.get(connection_id).map(|c| c.clone())
    }

    /// Flip a connection's presence status. Returns the updated entry.
    pub fn set_status(&self, connection_id: &ConnectionId, status: Status) -> Option<Connection> {
        let mut conn = self.connections.get_mut(connection_id)?;
        conn.status = status;
        Some(conn.clone())
    }

    /// Whether an identity has at least one live connection.
    pub fn is_online(&self, identity: &Identity) -> bool {
        self.by_identity
            .get(identity)
            .is_some_and(|ids| !ids.is_empty())
    }

    /// Connection ids currently owned by an identity.
    pub fn connections_for(&self, identity: &Identity) -> Vec<ConnectionId> {
        self.by_identity
            .get(identity)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// When the identity's last connection left, if it is offline.
    pub fn last_seen(&self, identity: &Identity) -> Option<DateTime<Utc>> {
        self.last_seen.get(identity).map(|t| *t)
    }

    /// Snapshot of online identities, one entry per identity, ordered.
    ///
    /// A snapshot, not a live view - callers re-query for freshness.
    pub fn list_online(&self) -> Vec<PresenceEntry> {
        let mut seen = HashSet::new();
        let mut entries: Vec<PresenceEntry> = self
            .connections
            .iter()
            .filter(|c| seen.insert(c.identity.clone()))
            .map(|c| PresenceEntry {
                identity: c.identity.clone(),
                display_name: c.display_name.clone(),
                status: c.status,
            })
            .collect();
        entries.sort_by(|a, b| a.identity.cmp(&b.identity));
        entries
    }

    /// Number of live connections (metrics gauge).
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cid(s: &str) -> ConnectionId {
        ConnectionId(s.to_string())
    }

    #[test]
    fn multi_session_identity_stays_online_until_last_unregister() {
        let registry = ConnectionRegistry::new();
        let ada = Identity::from("ada");

        assert!(registry.register(cid("c1"), ada.clone(), "Ada".into()));
        // Second device: identity already online.
        assert!(!registry.register(cid("c2"), ada.clone(), "Ada".into()));

        let (_, last) = registry.unregister(&cid("c1")).unwrap();
        assert!(!last);
        assert!(registry.is_online(&ada));
        assert!(registry.last_seen(&ada).is_none());

        let (_, last) = registry.unregister(&cid("c2")).unwrap();
        assert!(last);
        assert!(!registry.is_online(&ada));
        assert!(registry.last_seen(&ada).is_some());
    }

    #[test]
    fn unregister_unknown_connection_is_not_fatal() {
        let registry = ConnectionRegistry::new();
        assert!(registry.unregister(&cid("ghost")).is_none());
    }

    #[test]
    fn list_online_dedupes_identities_and_is_ordered() {
        let registry = ConnectionRegistry::new();
        registry.register(cid("c1"), Identity::from("zed"), "Zed".into());
        registry.register(cid("c2"), Identity::from("ada"), "Ada".into());
        registry.register(cid("c3"), Identity::from("ada"), "Ada".into());

        let online = registry.list_online();
        let ids: Vec<_> = online.iter().map(|e| e.identity.as_str()).collect();
        assert_eq!(ids, ["ada", "zed"]);
    }

    #[test]
    fn set_status_updates_the_entry() {
        let registry = ConnectionRegistry::new();
        registry.register(cid("c1"), Identity::from("ada"), "Ada".into());
        let conn = registry.set_status(&cid("c1"), Status::Away).unwrap();
        assert_eq!(conn.status, Status::Away);
        assert_eq!(registry.resolve(&cid("c1")).unwrap().status, Status::Away);
    }

    #[test]
    fn reconnect_clears_last_seen() {
        let registry = ConnectionRegistry::new();
        let ada = Identity::from("ada");
        registry.register(cid("c1"), ada.clone(), "Ada".into());
        registry.unregister(&cid("c1"));
        assert!(registry.last_seen(&ada).is_some());

        registry.register(cid("c2"), ada.clone(), "Ada".into());
        assert!(registry.last_seen(&ada).is_none());
    }
}

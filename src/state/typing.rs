//! TypingTracker - per-room typing indicators with self-expiry.
//!
//! Each `(identity, room)` pair holds exactly one deadline. Re-setting
//! typing replaces the deadline rather than stacking timers; the entry is
//! removed by explicit stop, by sending a message, by disconnect, or by the
//! sweeper once the deadline passes - whichever comes first.

use crate::protocol::{Identity, RoomId};
use dashmap::DashMap;
use std::time::{Duration, Instant};

pub struct TypingTracker {
    /// Currently-typing pairs and when they expire.
    deadlines: DashMap<(Identity, RoomId), Instant>,
    ttl: Duration,
}

impl TypingTracker {
    pub fn new(ttl: Duration) -> Self {
        Self {
            deadlines: DashMap::new(),
            ttl,
        }
    }

    /// (Re)insert the pair and (re)start its expiry deadline.
    pub fn set_typing(&self, identity: Identity, room: RoomId) {
        self.deadlines
            .insert((identity, room), Instant::now() + self.ttl);
    }

    /// Remove the pair immediately. Returns whether it was present.
    pub fn clear_typing(&self, identity: &Identity, room: &RoomId) -> bool {
        self.deadlines
            .remove(&(identity.clone(), room.clone()))
            .is_some()
    }

    /// Drop every entry an identity holds, across all rooms.
    ///
    /// Called on disconnect; returns the affected rooms so the caller can
    /// push fresh typer snapshots.
    pub fn clear_all_for(&self, identity: &Identity) -> Vec<RoomId> {
        let mut affected = Vec::new();
        self.deadlines.retain(|(owner, room), _| {
            if owner == identity {
                affected.push(room.clone());
                false
            } else {
                true
            }
        });
        affected.sort();
        affected.dedup();
        affected
    }

    /// Snapshot of currently-typing identities in a room, ordered.
    pub fn current_typers(&self, room: &RoomId) -> Vec<Identity> {
        let mut typers: Vec<Identity> = self
            .deadlines
            .iter()
            .filter(|entry| &entry.key().1 == room)
            .map(|entry| entry.key().0.clone())
            .collect();
        typers.sort();
        typers
    }

    /// Remove expired entries and return the rooms they were in.
    ///
    /// Driven by the background sweeper; deadline replacement in
    /// [`set_typing`] is what makes each timer cancellable.
    pub fn collect_expired(&self, now: Instant) -> Vec<RoomId> {
        let mut affected = Vec::new();
        self.deadlines.retain(|(_, room), deadline| {
            if *deadline <= now {
                affected.push(room.clone());
                false
            } else {
                true
            }
        });
        affected.sort();
        affected.dedup();
        affected
    }
}

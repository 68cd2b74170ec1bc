//! Reaction ledger and read tracker.
//!
//! Annotations mutate messages in place while they are resident in their
//! room's ring. Once a message is evicted its annotations are gone with it;
//! `None` from these operations is a normal outcome the router reports to
//! the sender only.

use crate::protocol::{Identity, MessageId, RoomId};
use crate::state::rooms::RoomDirectory;
use std::sync::Arc;

/// Outcome of a read-receipt attempt on a resident message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// First read by this identity; a delta should be broadcast.
    Applied,
    /// Idempotent no-op success - the broadcast is skipped.
    AlreadyRead,
}

/// Per-message mutable annotations: reactions (last-write-wins per identity)
/// and monotone read-by sets.
pub struct AnnotationLedger {
    rooms: Arc<RoomDirectory>,
}

impl AnnotationLedger {
    pub fn new(rooms: Arc<RoomDirectory>) -> Self {
        Self { rooms }
    }

    /// Set or overwrite an identity's reaction on a message.
    ///
    /// One active reaction per identity: a new type from the same identity
    /// unconditionally replaces the prior one. Returns the message's room,
    /// or `None` if the message has been evicted.
    pub async fn set_reaction(
        &self,
        message_id: MessageId,
        identity: Identity,
        reaction_type: String,
    ) -> Option<RoomId> {
        self.rooms
            .with_message(message_id, |msg| {
                msg.reactions.insert(identity, reaction_type);
                msg.room_id.clone()
            })
            .await
    }

    /// Mark a message read by an identity. `read_by` only grows.
    pub async fn mark_read(
        &self,
        message_id: MessageId,
        identity: Identity,
    ) -> Option<(RoomId, ReadOutcome)> {
        self.rooms
            .with_message(message_id, |msg| {
                let outcome = if msg.read_by.insert(identity) {
                    ReadOutcome::Applied
                } else {
                    ReadOutcome::AlreadyRead
                };
                (msg.room_id.clone(), outcome)
            })
            .await
    }
}

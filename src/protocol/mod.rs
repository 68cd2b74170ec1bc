//! Wire protocol for the coordinator.
//!
//! Events cross the WebSocket boundary as internally-tagged JSON. Inbound
//! frames deserialize into [`ClientEvent`]; everything the coordinator emits
//! is a [`ServerEvent`]. Messages have exactly one shape - inbound events
//! that do not match are rejected at the serde boundary, never normalized
//! downstream.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable participant identifier, independent of any single connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(pub String);

impl Identity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique per-session connection identifier, assigned by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub String);

impl ConnectionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Addressable broadcast scope identifier.
///
/// The public room is the well-known `"public"`. Channels use their
/// configured ids. Private pair rooms are derived via
/// [`crate::state::private_room_id`] and carry a `dm:` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

/// The well-known id of the global room every connection joins.
pub const PUBLIC_ROOM: &str = "public";

impl RoomId {
    pub fn public() -> Self {
        Self(PUBLIC_ROOM.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Room kind, fixed at room creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
    Public,
    Channel,
    Private,
}

/// Presence status of a single connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Online,
    Away,
}

/// Coordinator-assigned message identifier.
///
/// A global monotonic counter - enough for display ordering, not a
/// durability guarantee.
pub type MessageId = u64;

/// A chat message resident in a room's ring history.
///
/// Immutable except for its annotations: `reactions` holds at most one
/// reaction per identity (last write wins) and `read_by` only grows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender: Identity,
    pub sender_name: String,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub reactions: std::collections::HashMap<Identity, String>,
    #[serde(default)]
    pub read_by: std::collections::HashSet<Identity>,
}

/// One entry in a presence snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEntry {
    pub identity: Identity,
    pub display_name: String,
    pub status: Status,
}

/// Events a client sends to the coordinator.
///
/// `disconnect` is transport-triggered and deliberately has no variant here.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientEvent {
    /// First event on every connection; anything else beforehand is rejected.
    #[serde(rename_all = "camelCase")]
    Connect {
        display_name: String,
        #[serde(default)]
        credential: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Send {
        content: String,
        room_kind: RoomKind,
        /// Channel id for `channel`, peer identity for `private`. Ignored
        /// for `public`.
        #[serde(default)]
        target: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Typing {
        is_typing: bool,
        #[serde(default)]
        room: Option<RoomId>,
    },
    #[serde(rename_all = "camelCase")]
    Reaction {
        message_id: MessageId,
        reaction_type: String,
    },
    #[serde(rename_all = "camelCase")]
    Read { message_id: MessageId },
    #[serde(rename_all = "camelCase")]
    JoinPrivate { other_identity: Identity },
    #[serde(rename_all = "camelCase")]
    JoinChannel { channel_id: String },
    #[serde(rename_all = "camelCase")]
    SetStatus { status: Status },
}

impl ClientEvent {
    /// Static event name for dispatch and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::Send { .. } => "send",
            Self::Typing { .. } => "typing",
            Self::Reaction { .. } => "reaction",
            Self::Read { .. } => "read",
            Self::JoinPrivate { .. } => "joinPrivate",
            Self::JoinChannel { .. } => "joinChannel",
            Self::SetStatus { .. } => "setStatus",
        }
    }
}

/// Events the coordinator emits to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Registration ack so the client knows its own identity.
    #[serde(rename_all = "camelCase")]
    Welcome {
        connection_id: ConnectionId,
        identity: Identity,
    },
    #[serde(rename_all = "camelCase")]
    PresenceSnapshot { online: Vec<PresenceEntry> },
    #[serde(rename_all = "camelCase")]
    PresenceChanged {
        identity: Identity,
        online: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        last_seen_at: Option<chrono::DateTime<chrono::Utc>>,
    },
    #[serde(rename_all = "camelCase")]
    RoomHistory {
        room_id: RoomId,
        messages: Vec<Message>,
    },
    #[serde(rename_all = "camelCase")]
    NewMessage { message: Message },
    #[serde(rename_all = "camelCase")]
    TypingSnapshot {
        room_id: RoomId,
        typers: Vec<Identity>,
    },
    #[serde(rename_all = "camelCase")]
    ReactionChanged {
        message_id: MessageId,
        identity: Identity,
        reaction_type: String,
    },
    #[serde(rename_all = "camelCase")]
    ReadReceiptAdded {
        message_id: MessageId,
        identity: Identity,
    },
    #[serde(rename_all = "camelCase")]
    ErrorEvent { code: String, context: String },
}

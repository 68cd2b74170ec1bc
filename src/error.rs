//! Unified error handling for parleyd.
//!
//! One taxonomy for event processing, with metric labels and conversion to
//! sender-only error events. Nothing here is fatal to the coordinator: a bad
//! event affects only the originating connection's outcome.

use crate::protocol::ServerEvent;
use thiserror::Error;

/// Errors that can occur while handling an inbound event.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The sending connection is unknown - a race between disconnect and a
    /// trailing event. Silently dropped.
    #[error("stale connection")]
    StaleConnection,

    /// Event that requires registration arrived before `connect`.
    #[error("not connected")]
    NotConnected,

    /// Second `connect` on an already registered connection.
    #[error("already connected")]
    AlreadyConnected,

    /// Credential rejected at connect time; the connection is closed.
    #[error("authentication rejected: {0}")]
    AuthRejected(String),

    #[error("no such room: {0}")]
    RoomNotFound(String),

    /// `joinChannel` against an id outside the static channel set.
    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    /// `joinPrivate` targeting an identity the coordinator has never seen.
    #[error("unknown identity: {0}")]
    IdentityUnknown(String),

    /// The message has been evicted from history. Normal housekeeping
    /// outcome, reported to the sender only.
    #[error("no such message: {0}")]
    MessageNotFound(u64),

    #[error("empty message content")]
    EmptyMessage,

    #[error("malformed event: {0}")]
    Malformed(String),

    /// The connection's outgoing queue was full when a direct reply was
    /// queued. The client is not draining; the connection is closed.
    #[error("outgoing queue full")]
    Backpressure,
}

impl HandlerError {
    /// Static error code string for metric labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::StaleConnection => "stale_connection",
            Self::NotConnected => "not_connected",
            Self::AlreadyConnected => "already_connected",
            Self::AuthRejected(_) => "auth_rejected",
            Self::RoomNotFound(_) => "room_not_found",
            Self::UnknownChannel(_) => "unknown_channel",
            Self::IdentityUnknown(_) => "identity_unknown",
            Self::MessageNotFound(_) => "message_not_found",
            Self::EmptyMessage => "empty_message",
            Self::Malformed(_) => "malformed",
            Self::Backpressure => "backpressure",
        }
    }

    /// Convert to a sender-only error event.
    ///
    /// Returns `None` for outcomes that don't warrant a client-visible
    /// reply: stale connections are silently dropped, and a backed-up
    /// queue cannot take another event anyway.
    pub fn to_error_event(&self) -> Option<ServerEvent> {
        let code = match self {
            Self::StaleConnection | Self::Backpressure => return None,
            Self::NotConnected => "notConnected",
            Self::AlreadyConnected => "alreadyConnected",
            Self::AuthRejected(_) => "authRejected",
            Self::RoomNotFound(_) => "roomNotFound",
            Self::UnknownChannel(_) => "unknownChannel",
            Self::IdentityUnknown(_) => "identityUnknown",
            Self::MessageNotFound(_) => "messageNotFound",
            Self::EmptyMessage => "emptyMessage",
            Self::Malformed(_) => "malformed",
        };
        Some(ServerEvent::ErrorEvent {
            code: code.to_string(),
            context: self.to_string(),
        })
    }

    /// Whether this error should terminate the connection.
    ///
    /// Authentication failures and a full outgoing queue close the
    /// transport; everything else is a per-event outcome.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::AuthRejected(_) | Self::Backpressure)
    }
}

/// Result type for event handlers.
pub type HandlerResult = Result<(), HandlerError>;

//! Persistence collaborator abstraction.
//!
//! The coordinator's ring history is a cache, not the system of record.
//! Durable storage sits behind [`PersistenceStore`]; the router calls
//! `save` fire-and-forget after the state mutation is committed, and
//! `load_history` to warm a cold room on first join.

use crate::protocol::{Message, RoomId};
use async_trait::async_trait;
use thiserror::Error;

pub mod memory;
pub mod noop;

pub use memory::MemoryStore;
pub use noop::NoOpStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait PersistenceStore: Send + Sync {
    /// Persist a message. Latency here must never stall broadcast - callers
    /// spawn this off the event-handling path.
    async fn save(&self, message: &Message) -> Result<(), StoreError>;

    /// Load the most recent `limit` messages of a room, oldest first.
    async fn load_history(&self, room: &RoomId, limit: usize) -> Result<Vec<Message>, StoreError>;
}

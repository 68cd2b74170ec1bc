//! In-memory store backend.
//!
//! Keeps everything in a process-local map. Useful for tests and for
//! exercising the cold-room seeding path without a real database.

use super::{PersistenceStore, StoreError};
use crate::protocol::{Message, RoomId};
use async_trait::async_trait;
use dashmap::DashMap;

#[derive(Default)]
pub struct MemoryStore {
    by_room: DashMap<RoomId, Vec<Message>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages stored for a room.
    pub fn len(&self, room: &RoomId) -> usize {
        self.by_room.get(room).map_or(0, |v| v.len())
    }

    pub fn is_empty(&self, room: &RoomId) -> bool {
        self.len(room) == 0
    }
}

#[async_trait]
impl PersistenceStore for MemoryStore {
    async fn save(&self, message: &Message) -> Result<(), StoreError> {
        self.by_room
            .entry(message.room_id.clone())
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn load_history(&self, room: &RoomId, limit: usize) -> Result<Vec<Message>, StoreError> {
        let Some(messages) = self.by_room.get(room) else {
            return Ok(vec![]);
        };
        let skip = messages.len().saturating_sub(limit);
        Ok(messages.iter().skip(skip).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Identity;

    fn message(id: u64, room: &str) -> Message {
        Message {
            id,
            room_id: RoomId(room.to_string()),
            sender: Identity::from("ada"),
            sender_name: "Ada".into(),
            content: format!("m{id}"),
            created_at: chrono::Utc::now(),
            reactions: Default::default(),
            read_by: Default::default(),
        }
    }

    #[tokio::test]
    async fn load_history_returns_most_recent_oldest_first() {
        let store = MemoryStore::new();
        for id in 1..=5 {
            store.save(&message(id, "general")).await.unwrap();
        }
        let tail = store
            .load_history(&RoomId("general".into()), 2)
            .await
            .unwrap();
        assert_eq!(tail.iter().map(|m| m.id).collect::<Vec<_>>(), [4, 5]);
    }

    #[tokio::test]
    async fn unknown_room_loads_empty() {
        let store = MemoryStore::new();
        assert!(
            store
                .load_history(&RoomId("nowhere".into()), 10)
                .await
                .unwrap()
                .is_empty()
        );
    }
}

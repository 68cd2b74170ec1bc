//! No-op store that discards all messages.
//!
//! Used when persistence is disabled or unavailable. All operations succeed
//! but store nothing.

use super::{PersistenceStore, StoreError};
use crate::protocol::{Message, RoomId};
use async_trait::async_trait;

pub struct NoOpStore;

#[async_trait]
impl PersistenceStore for NoOpStore {
    async fn save(&self, _message: &Message) -> Result<(), StoreError> {
        Ok(())
    }

    async fn load_history(&self, _room: &RoomId, _limit: usize) -> Result<Vec<Message>, StoreError> {
        Ok(vec![])
    }
}

//! Transcript store trait.
//!
//! ドメイン層が必要とする永続ストアへのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;

use super::entity::Message;
use super::value_object::{RoomId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Interface over the durable store, treated as an ordered append-only
/// log keyed by room.
///
/// The store is assumed to serialize its own writes per room; callers
/// provide ordering by invoking `append` in the order messages are
/// accepted.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Append a message to the room's transcript.
    async fn append(&self, message: &Message) -> Result<(), StoreError>;

    /// Fetch the `limit` most recent messages of a room, returned
    /// oldest-first.
    async fn recent_messages(&self, room_id: &RoomId, limit: u32)
    -> Result<Vec<Message>, StoreError>;

    /// Record durable room membership. Idempotent: recording the same
    /// `(room, user)` pair twice is a no-op.
    async fn add_participant(&self, room_id: &RoomId, user_id: &UserId) -> Result<(), StoreError>;
}

//! In-memory transcript store.
//!
//! Keeps the whole transcript in a vector in arrival order, which makes
//! the ordering contract trivial to reason about in tests.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Message, RoomId, StoreError, TranscriptStore, UserId};

#[derive(Default)]
struct MemoryState {
    messages: Vec<Message>,
    participants: HashMap<RoomId, HashSet<UserId>>,
}

/// In-memory implementation of [`TranscriptStore`].
pub struct InMemoryTranscriptStore {
    state: Mutex<MemoryState>,
}

impl InMemoryTranscriptStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
        }
    }

    /// Number of durable participant records for a room.
    pub async fn participant_count(&self, room_id: &RoomId) -> usize {
        let state = self.state.lock().await;
        state
            .participants
            .get(room_id)
            .map(HashSet::len)
            .unwrap_or(0)
    }

    /// Number of persisted messages in a room.
    pub async fn message_count(&self, room_id: &RoomId) -> usize {
        let state = self.state.lock().await;
        state
            .messages
            .iter()
            .filter(|m| &m.room_id == room_id)
            .count()
    }
}

impl Default for InMemoryTranscriptStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscriptStore for InMemoryTranscriptStore {
    async fn append(&self, message: &Message) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.messages.push(message.clone());
        Ok(())
    }

    async fn recent_messages(
        &self,
        room_id: &RoomId,
        limit: u32,
    ) -> Result<Vec<Message>, StoreError> {
        let state = self.state.lock().await;
        let room_messages: Vec<Message> = state
            .messages
            .iter()
            .filter(|m| &m.room_id == room_id)
            .cloned()
            .collect();
        let skip = room_messages.len().saturating_sub(limit as usize);
        Ok(room_messages.into_iter().skip(skip).collect())
    }

    async fn add_participant(&self, room_id: &RoomId, user_id: &UserId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state
            .participants
            .entry(room_id.clone())
            .or_default()
            .insert(user_id.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MessageContent, Username};
    use chrono::{TimeZone, Utc};

    fn message(room: &RoomId, n: u32) -> Message {
        Message::user(
            room.clone(),
            UserId::new("u1").unwrap(),
            Username::new("alice").unwrap(),
            MessageContent::new(format!("message {n}")).unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, n).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_recent_messages_returns_newest_window_oldest_first() {
        // テスト項目: 直近 N 件が古い順で返される
        // given (前提条件):
        let store = InMemoryTranscriptStore::new();
        let room = RoomId::new("r1").unwrap();
        for n in 0..5 {
            store.append(&message(&room, n)).await.unwrap();
        }

        // when (操作):
        let recent = store.recent_messages(&room, 3).await.unwrap();

        // then (期待する結果):
        let contents: Vec<&str> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["message 2", "message 3", "message 4"]);
    }

    #[tokio::test]
    async fn test_recent_messages_filters_by_room() {
        // テスト項目: 他ルームのメッセージが混ざらない
        // given (前提条件):
        let store = InMemoryTranscriptStore::new();
        let r1 = RoomId::new("r1").unwrap();
        let r2 = RoomId::new("r2").unwrap();
        store.append(&message(&r1, 1)).await.unwrap();
        store.append(&message(&r2, 2)).await.unwrap();

        // when (操作):
        let recent = store.recent_messages(&r1, 10).await.unwrap();

        // then (期待する結果):
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].room_id, r1);
    }

    #[tokio::test]
    async fn test_add_participant_is_idempotent() {
        // テスト項目: 同じ参加者の二重登録でレコードが重複しない
        // given (前提条件):
        let store = InMemoryTranscriptStore::new();
        let room = RoomId::new("r1").unwrap();
        let user = UserId::new("u1").unwrap();

        // when (操作):
        store.add_participant(&room, &user).await.unwrap();
        store.add_participant(&room, &user).await.unwrap();

        // then (期待する結果):
        assert_eq!(store.participant_count(&room).await, 1);
    }
}

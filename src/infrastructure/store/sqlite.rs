//! SQLite-backed transcript store.
//!
//! The adapter owns its schema and creates it idempotently on connect.
//! `username` is denormalized into the messages table so history replay
//! does not depend on the identity layer's tables.

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use uuid::Uuid;

use crate::common::time::{from_rfc3339, to_rfc3339_millis};
use crate::domain::{
    Message, MessageContent, MessageType, RoomId, StoreError, TranscriptStore, UserId, Username,
};

const CREATE_MESSAGES: &str = "
CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY,
    room_id TEXT NOT NULL,
    user_id TEXT,
    username TEXT NOT NULL,
    content TEXT NOT NULL,
    message_type TEXT NOT NULL DEFAULT 'user',
    created_at TEXT NOT NULL
)";

const CREATE_PARTICIPANTS: &str = "
CREATE TABLE IF NOT EXISTS room_participants (
    room_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    joined_at TEXT NOT NULL,
    PRIMARY KEY (room_id, user_id)
)";

type MessageRow = (
    String,         // id
    String,         // room_id
    Option<String>, // user_id
    String,         // username
    String,         // content
    String,         // message_type
    String,         // created_at
);

/// SQLite implementation of [`TranscriptStore`].
pub struct SqliteTranscriptStore {
    pool: SqlitePool,
}

impl SqliteTranscriptStore {
    /// Connect to the database and create the schema if needed.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        // A `:memory:` database exists per connection; keep the pool at one.
        let max_connections = if database_url.contains(":memory:") { 1 } else { 16 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(backend)?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_MESSAGES)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        sqlx::query(CREATE_PARTICIPANTS)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }

    fn row_to_message(row: MessageRow) -> Result<Message, StoreError> {
        let (id, room_id, user_id, username, content, message_type, created_at) = row;
        let message_type = match message_type.as_str() {
            "ai" => MessageType::Assistant,
            _ => MessageType::User,
        };
        Ok(Message {
            id: Uuid::parse_str(&id).map_err(backend)?,
            room_id: RoomId::new(room_id).map_err(backend)?,
            user_id: user_id.map(UserId::new).transpose().map_err(backend)?,
            username: Username::new(username).map_err(backend)?,
            content: MessageContent::clamp(content),
            message_type,
            created_at: from_rfc3339(&created_at).map_err(backend)?,
        })
    }
}

fn backend(error: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(error.to_string())
}

#[async_trait]
impl TranscriptStore for SqliteTranscriptStore {
    async fn append(&self, message: &Message) -> Result<(), StoreError> {
        let message_type = match message.message_type {
            MessageType::User => "user",
            MessageType::Assistant => "ai",
        };
        sqlx::query(
            "INSERT INTO messages (id, room_id, user_id, username, content, message_type, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(message.id.to_string())
        .bind(message.room_id.as_str())
        .bind(message.user_id.as_ref().map(UserId::as_str))
        .bind(message.username.as_str())
        .bind(message.content.as_str())
        .bind(message_type)
        .bind(to_rfc3339_millis(message.created_at))
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn recent_messages(
        &self,
        room_id: &RoomId,
        limit: u32,
    ) -> Result<Vec<Message>, StoreError> {
        // Newest first, tie-broken by insertion order, then reversed so
        // callers receive the window oldest-first.
        let rows: Vec<MessageRow> = sqlx::query_as(
            "SELECT id, room_id, user_id, username, content, message_type, created_at \
             FROM messages WHERE room_id = ? \
             ORDER BY created_at DESC, rowid DESC LIMIT ?",
        )
        .bind(room_id.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let mut messages = rows
            .into_iter()
            .map(Self::row_to_message)
            .collect::<Result<Vec<_>, _>>()?;
        messages.reverse();
        Ok(messages)
    }

    async fn add_participant(&self, room_id: &RoomId, user_id: &UserId) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT OR IGNORE INTO room_participants (room_id, user_id, joined_at) VALUES (?, ?, ?)",
        )
        .bind(room_id.as_str())
        .bind(user_id.as_str())
        .bind(to_rfc3339_millis(chrono::Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    async fn test_store() -> SqliteTranscriptStore {
        SqliteTranscriptStore::connect("sqlite::memory:")
            .await
            .unwrap()
    }

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
    async fn test_append_then_read_round_trips_fields() {
        // テスト項目: 保存したメッセージの全フィールドが復元される
        // given (前提条件):
        let store = test_store().await;
        let room = RoomId::new("r1").unwrap();
        let original = message(&room, 1);

        // when (操作):
        store.append(&original).await.unwrap();
        let recent = store.recent_messages(&room, 10).await.unwrap();

        // then (期待する結果):
        assert_eq!(recent, vec![original]);
    }

    #[tokio::test]
    async fn test_recent_messages_window_is_oldest_first() {
        // テスト項目: 直近 N 件が古い順で返される
        // given (前提条件):
        let store = test_store().await;
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
    async fn test_equal_timestamps_keep_insertion_order() {
        // テスト項目: 同一タイムスタンプでも挿入順が保持される
        // given (前提条件):
        let store = test_store().await;
        let room = RoomId::new("r1").unwrap();
        let instant = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        for n in 0..3 {
            let mut m = message(&room, n);
            m.created_at = instant;
            store.append(&m).await.unwrap();
        }

        // when (操作):
        let recent = store.recent_messages(&room, 10).await.unwrap();

        // then (期待する結果):
        let contents: Vec<&str> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["message 0", "message 1", "message 2"]);
    }

    #[tokio::test]
    async fn test_assistant_message_round_trips_null_user_id() {
        // テスト項目: user_id が NULL のアシスタントメッセージが復元される
        // given (前提条件):
        let store = test_store().await;
        let room = RoomId::new("r1").unwrap();
        let original = Message::assistant(
            room.clone(),
            MessageContent::new("generated").unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        );

        // when (操作):
        store.append(&original).await.unwrap();
        let recent = store.recent_messages(&room, 10).await.unwrap();

        // then (期待する結果):
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].user_id, None);
        assert_eq!(recent[0].message_type, MessageType::Assistant);
    }

    #[tokio::test]
    async fn test_add_participant_is_idempotent() {
        // テスト項目: 同じ参加者の二重登録でレコードが重複しない
        // given (前提条件):
        let store = test_store().await;
        let room = RoomId::new("r1").unwrap();
        let user = UserId::new("u1").unwrap();

        // when (操作):
        store.add_participant(&room, &user).await.unwrap();
        store.add_participant(&room, &user).await.unwrap();

        // then (期待する結果):
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM room_participants WHERE room_id = ?")
                .bind(room.as_str())
                .fetch_one(&store.pool)
                .await
                .unwrap();
        assert_eq!(count, 1);
    }
}

//! Domain entities: the immutable message record and the transcript
//! slice handed to the text-generation service.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::value_object::{MessageContent, RoomId, UserId, Username};

/// Display name the assistant posts under.
pub const ASSISTANT_USERNAME: &str = "AI Assistant";

/// Fixed assistant reply substituted when generation fails, preserving
/// the one-reply-per-turn invariant.
pub const FALLBACK_REPLY: &str =
    "Sorry, I encountered an error processing your request. Please try again.";

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    User,
    Assistant,
}

/// One immutable entry in a room's transcript. Created once, appended
/// to the durable log in arrival order, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub room_id: RoomId,
    /// `None` for assistant messages.
    pub user_id: Option<UserId>,
    pub username: Username,
    pub content: MessageContent,
    pub message_type: MessageType,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Build a user message with a freshly assigned identifier.
    pub fn user(
        room_id: RoomId,
        user_id: UserId,
        username: Username,
        content: MessageContent,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id,
            user_id: Some(user_id),
            username,
            content,
            message_type: MessageType::User,
            created_at,
        }
    }

    /// Build an assistant message with a freshly assigned identifier.
    pub fn assistant(room_id: RoomId, content: MessageContent, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id,
            user_id: None,
            username: Username::assistant(),
            content,
            message_type: MessageType::Assistant,
            created_at,
        }
    }
}

/// Role of one transcript turn as seen by the text-generation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Assistant,
}

/// One `{role, content}` pair of the bounded transcript window handed
/// to the text-generation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptTurn {
    pub role: TurnRole,
    pub content: String,
}

impl From<&Message> for TranscriptTurn {
    fn from(message: &Message) -> Self {
        Self {
            role: match message.message_type {
                MessageType::Assistant => TurnRole::Assistant,
                MessageType::User => TurnRole::User,
            },
            content: message.content.as_str().to_string(),
        }
    }
}

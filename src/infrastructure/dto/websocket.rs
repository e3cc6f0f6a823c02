//! WebSocket event frames.
//!
//! Every frame is a JSON object discriminated by a `type` field. Event
//! payload fields are camelCase and message objects are snake_case,
//! matching the protocol the existing clients speak.

use serde::{Deserialize, Serialize};

/// Wire representation of one transcript message, exactly as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDto {
    pub id: String,
    pub room_id: String,
    pub user_id: Option<String>,
    pub content: String,
    pub message_type: MessageTypeDto,
    pub username: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageTypeDto {
    User,
    Ai,
}

/// Inbound client → server events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    JoinRoom {
        room_id: String,
        user_id: String,
        username: String,
    },
    SendMessage {
        room_id: String,
        content: String,
        user_id: String,
        username: String,
    },
    Typing {
        room_id: String,
        username: String,
        is_typing: bool,
    },
    LeaveRoom {
        room_id: String,
    },
}

/// Outbound server → client events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Point-in-time history snapshot, delivered to the joiner only.
    RoomMessages { messages: Vec<MessageDto> },
    UserJoined {
        username: String,
        user_id: String,
    },
    /// Message fields are flattened into the event object.
    NewMessage(MessageDto),
    UserTyping {
        username: String,
        is_typing: bool,
    },
    UserLeft {
        username: String,
        user_id: String,
    },
    /// Delivered to the originating connection only, never broadcast.
    Error { message: String },
}

impl ServerEvent {
    /// Encode an event as a wire frame.
    ///
    /// Serialization of these enums cannot fail (string keys, no
    /// non-serializable values), so the panic branch is unreachable.
    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::error!("failed to encode server event: {}", e);
            r#"{"type":"error","message":"internal error"}"#.to_string()
        })
    }
}

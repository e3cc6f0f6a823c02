//! Conversion logic between DTOs and domain entities.

use crate::common::time::to_rfc3339_millis;
use crate::domain::{Message, MessageType};
use crate::infrastructure::dto::websocket::{MessageDto, MessageTypeDto};

// ========================================
// Domain Entity → DTO
// ========================================

impl From<&Message> for MessageDto {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id.to_string(),
            room_id: message.room_id.as_str().to_string(),
            user_id: message.user_id.as_ref().map(|id| id.as_str().to_string()),
            content: message.content.as_str().to_string(),
            message_type: message.message_type.into(),
            username: message.username.as_str().to_string(),
            created_at: to_rfc3339_millis(message.created_at),
        }
    }
}

impl From<Message> for MessageDto {
    fn from(message: Message) -> Self {
        Self::from(&message)
    }
}

impl From<MessageType> for MessageTypeDto {
    fn from(message_type: MessageType) -> Self {
        match message_type {
            MessageType::User => MessageTypeDto::User,
            MessageType::Assistant => MessageTypeDto::Ai,
        }
    }
}

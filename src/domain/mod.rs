//! Domain layer: entities, value objects, and the traits the
//! coordinator depends on.
//!
//! The traits defined here (`TranscriptStore`, `MessagePusher`,
//! `TextGenerator`) are the seams to the durable store, the live
//! transport, and the external text-generation service. Concrete
//! implementations live in the infrastructure layer (dependency
//! inversion).

pub mod entity;
pub mod generator;
pub mod pusher;
pub mod store;
pub mod value_object;

pub use entity::{ASSISTANT_USERNAME, FALLBACK_REPLY, Message, MessageType, TranscriptTurn, TurnRole};
pub use generator::{GenerationError, GenerationParams, TextGenerator};
pub use pusher::{MessagePusher, PushError, PusherChannel};
pub use store::{StoreError, TranscriptStore};
pub use value_object::{ConnectionId, MessageContent, RoomId, UserId, Username, ValidationError};

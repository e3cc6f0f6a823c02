//! UseCase layer: one usecase per coordinator operation.
//!
//! Each usecase owns the validate → persist → fan-out sequence of its
//! operation and runs it inside the per-room lock, which provides the
//! per-room total order over join/send/leave events.

mod error;
mod generate_reply;
mod generation_tasks;
mod join_room;
mod leave_room;
mod relay_typing;
mod room_locks;
mod send_message;
mod summarize_room;

pub use error::{JoinRoomError, SendMessageError, SummarizeError};
pub use generate_reply::{
    ASSISTANT_SYSTEM_PROMPT, GenerateReplyUseCase, GenerationPolicy,
};
pub use generation_tasks::GenerationTasks;
pub use join_room::JoinRoomUseCase;
pub use leave_room::LeaveRoomUseCase;
pub use relay_typing::RelayTypingUseCase;
pub use room_locks::RoomLocks;
pub use send_message::SendMessageUseCase;
pub use summarize_room::{FALLBACK_SUMMARY, NO_MESSAGES_SUMMARY, SummarizeRoomUseCase};

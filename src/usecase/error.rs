//! UseCase error types.
//!
//! Failures local to one connection's action are reported only to that
//! connection; the UI layer maps these variants to `error` frames.

use crate::domain::{StoreError, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JoinRoomError {
    /// Presence operation on a connection that was never registered.
    /// Fatal to the connection: the UI layer tears it down.
    #[error("connection is not registered")]
    UnknownConnection,
    /// The durable membership record could not be written; the join is
    /// aborted with no side effects.
    #[error("failed to record room membership: {0}")]
    Membership(#[source] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendMessageError {
    /// `send_message` before a completed `join_room`, or for a room the
    /// connection is not joined to. No side effects.
    #[error("connection has not joined this room")]
    NotJoined,
    #[error("invalid message content: {0}")]
    InvalidContent(#[from] ValidationError),
    /// The append failed; nothing was broadcast.
    #[error("failed to persist message: {0}")]
    Persistence(#[source] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SummarizeError {
    #[error("failed to read transcript: {0}")]
    Store(#[source] StoreError),
}

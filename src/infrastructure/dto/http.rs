//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

/// Response of `POST /api/rooms/{room_id}/summary`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub summary: String,
}

/// Response of `GET /debug/presence`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceSnapshotDto {
    pub rooms: Vec<RoomPresenceDto>,
}

/// Live connections of one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomPresenceDto {
    pub room_id: String,
    pub connections: Vec<String>,
}

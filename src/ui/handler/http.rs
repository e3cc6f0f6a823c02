//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::domain::RoomId;
use crate::infrastructure::dto::http::{PresenceSnapshotDto, RoomPresenceDto, SummaryResponse};
use crate::usecase::SummarizeError;

use super::super::state::AppState;

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Generate an on-demand summary of a room's recent transcript.
pub async fn summarize_room(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<SummaryResponse>, StatusCode> {
    let room_id = RoomId::new(room_id).map_err(|_| StatusCode::BAD_REQUEST)?;

    match state.summarize_room_usecase.execute(&room_id).await {
        Ok(summary) => Ok(Json(SummaryResponse { summary })),
        Err(e @ SummarizeError::Store(_)) => {
            tracing::error!(room_id = %room_id, error = %e, "summary transcript read failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Debug endpoint exposing the current presence snapshot.
pub async fn debug_presence(State(state): State<Arc<AppState>>) -> Json<PresenceSnapshotDto> {
    let rooms = state
        .presence
        .rooms_snapshot()
        .await
        .into_iter()
        .map(|(room_id, connections)| RoomPresenceDto {
            room_id: room_id.into_string(),
            connections: connections.iter().map(ToString::to_string).collect(),
        })
        .collect();

    Json(PresenceSnapshotDto { rooms })
}

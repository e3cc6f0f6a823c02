//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::domain::{ConnectionId, MessagePusher, RoomId, UserId, Username};
use crate::infrastructure::dto::websocket::{ClientEvent, ServerEvent};
use crate::usecase::{JoinRoomError, SendMessageError};

use super::super::state::AppState;

/// Query parameters of the WebSocket upgrade request, carrying the
/// identity service's output. The coordinator trusts this input.
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub user_id: String,
    pub username: String,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let user_id = match UserId::new(query.user_id) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("rejecting connection with invalid user_id: {}", e);
            return Err(StatusCode::BAD_REQUEST);
        }
    };
    let username = match Username::new(query.username) {
        Ok(name) => name,
        Err(e) => {
            tracing::warn!("rejecting connection with invalid username: {}", e);
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    // Connection identity is minted server-side on transport connect.
    let connection_id = ConnectionId::generate();

    // Create a channel for this connection to receive messages
    let (tx, rx) = mpsc::unbounded_channel();
    state.presence.register(connection_id, user_id, username).await;
    state.pusher.register_connection(connection_id, tx).await;

    tracing::info!("Connection '{}' registered", connection_id);

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, connection_id, rx)))
}

/// Spawns a task that receives frames from the rx channel and pushes
/// them to the WebSocket sender.
///
/// This is the outbound half of a connection: frames queued by the
/// usecases (via the MessagePusher) are written to this connection's
/// socket here, on its own task.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    connection_id: ConnectionId,
    rx: mpsc::UnboundedReceiver<String>,
) {
    let (sender, mut receiver) = socket.split();

    let mut send_task = pusher_loop(rx, sender);

    let state_clone = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::error!("WebSocket error on '{}': {}", connection_id, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    if !handle_event(&state_clone, connection_id, &text).await {
                        break;
                    }
                }
                Message::Close(_) => {
                    tracing::info!("Connection '{}' requested close", connection_id);
                    break;
                }
                Message::Ping(_) => {
                    // Ping/pong is handled automatically by the WebSocket protocol
                }
                _ => {}
            }
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    // Transport close has the same side effects as an explicit leave,
    // plus full deregistration. Idempotent if a leave already happened.
    state.leave_room_usecase.disconnect(connection_id).await;
    tracing::info!("Connection '{}' disconnected and cleaned up", connection_id);
}

/// Dispatch one inbound frame. Returns `false` when the connection must
/// be torn down.
///
/// Every failure of a usecase is caught here: it is logged, at most an
/// `error` frame goes back to the originating connection, and nothing
/// propagates out of the connection task.
async fn handle_event(state: &Arc<AppState>, connection_id: ConnectionId, text: &str) -> bool {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!("malformed event from '{}': {}", connection_id, e);
            send_error(state, connection_id, "Malformed event").await;
            return true;
        }
    };

    match event {
        ClientEvent::JoinRoom { room_id, .. } => {
            let Some(room_id) = parse_room_id(state, connection_id, room_id).await else {
                return true;
            };
            match state.join_room_usecase.execute(connection_id, room_id).await {
                Ok(()) => true,
                Err(JoinRoomError::UnknownConnection) => {
                    tracing::error!("presence op on unregistered connection '{}', tearing down", connection_id);
                    false
                }
                Err(e @ JoinRoomError::Membership(_)) => {
                    tracing::warn!("join failed for '{}': {}", connection_id, e);
                    send_error(state, connection_id, "Failed to join room").await;
                    true
                }
            }
        }
        ClientEvent::SendMessage { room_id, content, .. } => {
            let Some(room_id) = parse_room_id(state, connection_id, room_id).await else {
                return true;
            };
            match state
                .send_message_usecase
                .execute(connection_id, room_id, content)
                .await
            {
                Ok(()) => {}
                Err(SendMessageError::NotJoined) => {
                    send_error(state, connection_id, "Not joined to this room").await;
                }
                Err(e @ SendMessageError::InvalidContent(_)) => {
                    tracing::debug!("rejected message from '{}': {}", connection_id, e);
                    send_error(state, connection_id, "Invalid message content").await;
                }
                Err(e @ SendMessageError::Persistence(_)) => {
                    tracing::error!("send failed for '{}': {}", connection_id, e);
                    send_error(state, connection_id, "Failed to send message").await;
                }
            }
            true
        }
        ClientEvent::Typing { room_id, is_typing, .. } => {
            let Some(room_id) = parse_room_id(state, connection_id, room_id).await else {
                return true;
            };
            state
                .relay_typing_usecase
                .execute(connection_id, room_id, is_typing)
                .await;
            true
        }
        ClientEvent::LeaveRoom { .. } => {
            state.leave_room_usecase.execute(connection_id).await;
            true
        }
    }
}

async fn parse_room_id(
    state: &Arc<AppState>,
    connection_id: ConnectionId,
    room_id: String,
) -> Option<RoomId> {
    match RoomId::new(room_id) {
        Ok(room_id) => Some(room_id),
        Err(e) => {
            tracing::warn!("invalid room id from '{}': {}", connection_id, e);
            send_error(state, connection_id, "Invalid room id").await;
            None
        }
    }
}

async fn send_error(state: &Arc<AppState>, connection_id: ConnectionId, message: &str) {
    let frame = ServerEvent::Error {
        message: message.to_string(),
    }
    .encode();
    if let Err(e) = state.pusher.push_to(&connection_id, &frame).await {
        tracing::warn!("failed to deliver error frame to '{}': {}", connection_id, e);
    }
}

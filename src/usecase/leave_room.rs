//! UseCase: ルーム退出・切断処理
//!
//! Explicit `leave_room` and transport disconnect share the same side
//! effects; disconnect additionally deregisters the connection. Both
//! paths are idempotent so a disconnect firing after an explicit leave
//! is harmless.

use std::sync::Arc;

use crate::domain::{ConnectionId, MessagePusher};
use crate::infrastructure::dto::websocket::ServerEvent;
use crate::infrastructure::presence::PresenceRegistry;

use super::room_locks::RoomLocks;

/// ルーム退出のユースケース
pub struct LeaveRoomUseCase {
    /// PresenceRegistry（ライブ接続の管理）
    presence: Arc<PresenceRegistry>,
    /// MessagePusher（メッセージ通知の抽象化）
    pusher: Arc<dyn MessagePusher>,
    locks: Arc<RoomLocks>,
}

impl LeaveRoomUseCase {
    pub fn new(
        presence: Arc<PresenceRegistry>,
        pusher: Arc<dyn MessagePusher>,
        locks: Arc<RoomLocks>,
    ) -> Self {
        Self {
            presence,
            pusher,
            locks,
        }
    }

    /// ルーム退出を実行
    ///
    /// Broadcasts `user_left` to the remaining participants, then tears
    /// down the connection's presence in the room. No-op if the
    /// connection is not currently in a room.
    pub async fn execute(&self, connection_id: ConnectionId) {
        let Some(info) = self.presence.who_is(&connection_id).await else {
            return;
        };
        let Some(room_id) = info.room_id else {
            return;
        };

        let _guard = self.locks.acquire(&room_id).await;

        let targets: Vec<ConnectionId> = self
            .presence
            .live_connections(&room_id)
            .await
            .into_iter()
            .filter(|id| id != &connection_id)
            .collect();
        let left = ServerEvent::UserLeft {
            username: info.username.into_string(),
            user_id: info.user_id.into_string(),
        };
        if let Err(e) = self.pusher.broadcast(&targets, &left.encode()).await {
            tracing::warn!(room_id = %room_id, error = %e, "failed to broadcast user_left");
        }

        let _ = self.presence.leave_room(&connection_id).await;
    }

    /// 切断時のティアダウン
    ///
    /// Identical side effects to an explicit leave, plus full
    /// deregistration from presence and pusher.
    pub async fn disconnect(&self, connection_id: ConnectionId) {
        self.execute(connection_id).await;
        let _ = self.presence.remove(&connection_id).await;
        self.pusher.unregister_connection(&connection_id).await;
    }
}

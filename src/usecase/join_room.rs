//! UseCase: ルーム参加処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - JoinRoomUseCase::execute() メソッド
//! - 参加処理（永続メンバーシップ記録、履歴スナップショット配信、通知）
//!
//! ### なぜこのテストが必要か
//! - 履歴スナップショットが参加者だけに届くことを保証
//! - メンバーシップ記録の失敗時に join が中断されることを確認
//! - 履歴読み込み失敗時は空の履歴で join が成立することを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系: 新規参加、既存参加者への user_joined 通知
//! - 異常系: 未登録接続、メンバーシップ記録失敗
//! - エッジケース: 別ルーム参加中の join（暗黙の leave）

use std::sync::Arc;

use crate::domain::{ConnectionId, MessagePusher, RoomId, TranscriptStore};
use crate::infrastructure::dto::websocket::{MessageDto, ServerEvent};
use crate::infrastructure::presence::PresenceRegistry;

use super::error::JoinRoomError;
use super::leave_room::LeaveRoomUseCase;
use super::room_locks::RoomLocks;

/// Size of the history snapshot delivered to a joining connection.
const HISTORY_SNAPSHOT: u32 = 50;

/// ルーム参加のユースケース
pub struct JoinRoomUseCase {
    /// TranscriptStore（永続ストアの抽象化）
    store: Arc<dyn TranscriptStore>,
    /// PresenceRegistry（ライブ接続の管理）
    presence: Arc<PresenceRegistry>,
    /// MessagePusher（メッセージ通知の抽象化）
    pusher: Arc<dyn MessagePusher>,
    locks: Arc<RoomLocks>,
    /// 別ルーム参加中の join で暗黙の leave を行うために保持する
    leave_room: Arc<LeaveRoomUseCase>,
}

impl JoinRoomUseCase {
    pub fn new(
        store: Arc<dyn TranscriptStore>,
        presence: Arc<PresenceRegistry>,
        pusher: Arc<dyn MessagePusher>,
        locks: Arc<RoomLocks>,
        leave_room: Arc<LeaveRoomUseCase>,
    ) -> Self {
        Self {
            store,
            presence,
            pusher,
            locks,
            leave_room,
        }
    }

    /// ルーム参加を実行
    ///
    /// Records durable membership, registers presence, delivers the
    /// history snapshot to the joiner only, then notifies the other
    /// live connections in the room.
    pub async fn execute(
        &self,
        connection_id: ConnectionId,
        room_id: RoomId,
    ) -> Result<(), JoinRoomError> {
        let info = self
            .presence
            .who_is(&connection_id)
            .await
            .ok_or(JoinRoomError::UnknownConnection)?;

        // A connection belongs to at most one room: joining while joined
        // performs an implicit leave of the previous room first.
        let rejoining = info.room_id.as_ref() == Some(&room_id);
        if let Some(previous) = info.room_id.as_ref() {
            if previous != &room_id {
                self.leave_room.execute(connection_id).await;
            }
        }

        let _guard = self.locks.acquire(&room_id).await;

        // Durable membership is idempotent; a failed write aborts the
        // join with no side effects.
        self.store
            .add_participant(&room_id, &info.user_id)
            .await
            .map_err(JoinRoomError::Membership)?;

        self.presence
            .join_room(connection_id, room_id.clone())
            .await
            .map_err(|_| JoinRoomError::UnknownConnection)?;

        // Point-in-time snapshot for the joiner only. A failed history
        // read degrades to an empty snapshot rather than blocking the
        // join.
        let history = match self.store.recent_messages(&room_id, HISTORY_SNAPSHOT).await {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!(room_id = %room_id, error = %e, "failed to read history snapshot, delivering empty history");
                Vec::new()
            }
        };
        let snapshot = ServerEvent::RoomMessages {
            messages: history.iter().map(MessageDto::from).collect(),
        };
        if let Err(e) = self.pusher.push_to(&connection_id, &snapshot.encode()).await {
            tracing::warn!(connection_id = %connection_id, error = %e, "failed to deliver history snapshot");
        }

        // Notify every *other* live connection in the room. Skipped on a
        // re-join of the same room: the others already saw this join.
        if !rejoining {
            let targets: Vec<ConnectionId> = self
                .presence
                .live_connections(&room_id)
                .await
                .into_iter()
                .filter(|id| id != &connection_id)
                .collect();
            let joined = ServerEvent::UserJoined {
                username: info.username.into_string(),
                user_id: info.user_id.into_string(),
            };
            if let Err(e) = self.pusher.broadcast(&targets, &joined.encode()).await {
                tracing::warn!(room_id = %room_id, error = %e, "failed to broadcast user_joined");
            }
        }

        Ok(())
    }
}

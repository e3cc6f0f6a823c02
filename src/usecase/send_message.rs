//! UseCase: メッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//! - 永続化 → ブロードキャスト → 生成トリガーの一連の処理
//!
//! ### なぜこのテストが必要か
//! - 永続化失敗時に何も配信されないことを保証
//! - join 前の送信が副作用なしで拒否されることを確認
//! - 生成ウィンドウがトリガー時点で固定されることを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系: 送信者を含む全接続への配信と生成トリガー
//! - 異常系: 未 join、永続化失敗
//! - エッジケース: 生成中に届いた後続メッセージ

use std::sync::Arc;

use crate::common::time::Clock;
use crate::domain::{
    ConnectionId, Message, MessageContent, MessagePusher, RoomId, TranscriptStore, TranscriptTurn,
};
use crate::infrastructure::dto::websocket::ServerEvent;
use crate::infrastructure::presence::PresenceRegistry;

use super::error::SendMessageError;
use super::generate_reply::GenerateReplyUseCase;
use super::generation_tasks::GenerationTasks;
use super::room_locks::RoomLocks;

/// Number of recent messages handed to the generator as context.
const GENERATION_WINDOW: u32 = 10;

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    /// TranscriptStore（永続ストアの抽象化）
    store: Arc<dyn TranscriptStore>,
    /// PresenceRegistry（ライブ接続の管理）
    presence: Arc<PresenceRegistry>,
    /// MessagePusher（メッセージ通知の抽象化）
    pusher: Arc<dyn MessagePusher>,
    locks: Arc<RoomLocks>,
    clock: Arc<dyn Clock>,
    /// 生成パイプライン（非同期タスクとして起動される）
    generate_reply: Arc<GenerateReplyUseCase>,
    tasks: Arc<GenerationTasks>,
}

impl SendMessageUseCase {
    pub fn new(
        store: Arc<dyn TranscriptStore>,
        presence: Arc<PresenceRegistry>,
        pusher: Arc<dyn MessagePusher>,
        locks: Arc<RoomLocks>,
        clock: Arc<dyn Clock>,
        generate_reply: Arc<GenerateReplyUseCase>,
        tasks: Arc<GenerationTasks>,
    ) -> Self {
        Self {
            store,
            presence,
            pusher,
            locks,
            clock,
            generate_reply,
            tasks,
        }
    }

    /// メッセージ送信を実行
    ///
    /// Persists the message, echoes it to every live connection in the
    /// room (including the sender), then spawns the generation pipeline
    /// with a transcript window captured before the room lock is
    /// released.
    pub async fn execute(
        &self,
        connection_id: ConnectionId,
        room_id: RoomId,
        content: String,
    ) -> Result<(), SendMessageError> {
        // 1. The action is valid only from the Joined state, for the
        //    room the connection actually joined.
        let info = self
            .presence
            .who_is(&connection_id)
            .await
            .ok_or(SendMessageError::NotJoined)?;
        if info.room_id.as_ref() != Some(&room_id) {
            return Err(SendMessageError::NotJoined);
        }

        let content = MessageContent::new(content)?;

        // 2. Serialize persist + broadcast against other events of this
        //    room.
        let guard = self.locks.acquire(&room_id).await;

        let message = Message::user(
            room_id.clone(),
            info.user_id,
            info.username,
            content,
            self.clock.now_utc(),
        );

        // A failed append aborts the action; nothing is broadcast.
        self.store
            .append(&message)
            .await
            .map_err(SendMessageError::Persistence)?;

        // 3. Echo to every live connection in the room, sender included.
        let targets = self.presence.live_connections(&room_id).await;
        let frame = ServerEvent::NewMessage((&message).into()).encode();
        if let Err(e) = self.pusher.broadcast(&targets, &frame).await {
            tracing::warn!(room_id = %room_id, error = %e, "failed to broadcast message");
        }

        // 4. Capture the transcript window while still holding the room
        //    lock, pinning it against sends accepted after this one.
        let window: Vec<TranscriptTurn> = match self
            .store
            .recent_messages(&room_id, GENERATION_WINDOW)
            .await
        {
            Ok(messages) => messages.iter().map(TranscriptTurn::from).collect(),
            Err(e) => {
                tracing::warn!(room_id = %room_id, error = %e, "failed to read transcript window, degrading to trigger message only");
                vec![TranscriptTurn::from(&message)]
            }
        };
        drop(guard);

        let generate_reply = self.generate_reply.clone();
        self.tasks
            .spawn(async move {
                generate_reply.run(room_id, window).await;
            })
            .await;

        Ok(())
    }
}

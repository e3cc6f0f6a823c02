//! UseCase: タイピング通知の中継
//!
//! Pure relay: no persistence, no authoritative state, no timers. The
//! sending client is responsible for emitting `isTyping=false` after an
//! inactivity window and receivers expire stale indicators locally, so
//! the relay stays outside the per-room lock as a best-effort signal.

use std::sync::Arc;

use crate::domain::{ConnectionId, MessagePusher, RoomId};
use crate::infrastructure::dto::websocket::ServerEvent;
use crate::infrastructure::presence::PresenceRegistry;

/// タイピング通知のユースケース
pub struct RelayTypingUseCase {
    /// PresenceRegistry（ライブ接続の管理）
    presence: Arc<PresenceRegistry>,
    /// MessagePusher（メッセージ通知の抽象化）
    pusher: Arc<dyn MessagePusher>,
}

impl RelayTypingUseCase {
    pub fn new(presence: Arc<PresenceRegistry>, pusher: Arc<dyn MessagePusher>) -> Self {
        Self { presence, pusher }
    }

    /// タイピング状態を送信者以外の参加者に中継する
    pub async fn execute(&self, connection_id: ConnectionId, room_id: RoomId, is_typing: bool) {
        let Some(info) = self.presence.who_is(&connection_id).await else {
            tracing::debug!(connection_id = %connection_id, "typing relay from unknown connection, dropping");
            return;
        };

        let targets: Vec<ConnectionId> = self
            .presence
            .live_connections(&room_id)
            .await
            .into_iter()
            .filter(|id| id != &connection_id)
            .collect();
        let event = ServerEvent::UserTyping {
            username: info.username.into_string(),
            is_typing,
        };
        if let Err(e) = self.pusher.broadcast(&targets, &event.encode()).await {
            tracing::warn!(room_id = %room_id, error = %e, "failed to relay typing state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{UserId, Username};
    use crate::infrastructure::message_pusher::WebSocketMessagePusher;
    use tokio::sync::mpsc;

    struct Harness {
        presence: Arc<PresenceRegistry>,
        pusher: Arc<WebSocketMessagePusher>,
        usecase: RelayTypingUseCase,
    }

    fn harness() -> Harness {
        let presence = Arc::new(PresenceRegistry::new());
        let pusher = Arc::new(WebSocketMessagePusher::new());
        let usecase = RelayTypingUseCase::new(presence.clone(), pusher.clone());
        Harness {
            presence,
            pusher,
            usecase,
        }
    }

    async fn joined_connection(
        h: &Harness,
        room: &RoomId,
        name: &str,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<String>) {
        let connection_id = ConnectionId::generate();
        let (tx, rx) = mpsc::unbounded_channel();
        h.presence
            .register(
                connection_id,
                UserId::new(format!("{name}-id")).unwrap(),
                Username::new(name).unwrap(),
            )
            .await;
        h.pusher.register_connection(connection_id, tx).await;
        h.presence.join_room(connection_id, room.clone()).await.unwrap();
        (connection_id, rx)
    }

    #[tokio::test]
    async fn test_typing_reaches_everyone_but_the_sender() {
        // テスト項目: タイピング通知が送信者以外に届く
        // given (前提条件):
        let h = harness();
        let room = RoomId::new("r1").unwrap();
        let (alice, mut alice_rx) = joined_connection(&h, &room, "alice").await;
        let (_bob, mut bob_rx) = joined_connection(&h, &room, "bob").await;

        // when (操作):
        h.usecase.execute(alice, room.clone(), true).await;

        // then (期待する結果):
        let frame = bob_rx.recv().await.unwrap();
        let event: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(event["type"], "user_typing");
        assert_eq!(event["username"], "alice");
        assert_eq!(event["isTyping"], true);
        assert!(alice_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_typing_from_unknown_connection_is_dropped() {
        // テスト項目: 未登録接続からのタイピング通知は破棄される
        // given (前提条件):
        let h = harness();
        let room = RoomId::new("r1").unwrap();
        let (_bob, mut bob_rx) = joined_connection(&h, &room, "bob").await;

        // when (操作):
        h.usecase
            .execute(ConnectionId::generate(), room, true)
            .await;

        // then (期待する結果):
        assert!(bob_rx.try_recv().is_err());
    }
}

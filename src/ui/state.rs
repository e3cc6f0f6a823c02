//! Server state shared by the transport handlers.

use std::sync::Arc;

use crate::domain::MessagePusher;
use crate::infrastructure::presence::PresenceRegistry;
use crate::usecase::{
    JoinRoomUseCase, LeaveRoomUseCase, RelayTypingUseCase, SendMessageUseCase,
    SummarizeRoomUseCase,
};

/// Shared application state
pub struct AppState {
    /// PresenceRegistry（ライブ接続の管理）
    pub presence: Arc<PresenceRegistry>,
    /// MessagePusher（メッセージ通知の抽象化）
    pub pusher: Arc<dyn MessagePusher>,
    /// JoinRoomUseCase（ルーム参加のユースケース）
    pub join_room_usecase: Arc<JoinRoomUseCase>,
    /// SendMessageUseCase（メッセージ送信のユースケース）
    pub send_message_usecase: Arc<SendMessageUseCase>,
    /// LeaveRoomUseCase（退出・切断のユースケース）
    pub leave_room_usecase: Arc<LeaveRoomUseCase>,
    /// RelayTypingUseCase（タイピング通知のユースケース）
    pub relay_typing_usecase: Arc<RelayTypingUseCase>,
    /// SummarizeRoomUseCase（要約のユースケース）
    pub summarize_room_usecase: Arc<SummarizeRoomUseCase>,
}

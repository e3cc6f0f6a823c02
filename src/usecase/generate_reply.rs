//! UseCase: アシスタント応答の生成パイプライン
//!
//! The pipeline is isolated so its failures never corrupt room state or
//! block other rooms: the text-generation call runs outside any lock,
//! and only the append + broadcast tail re-enters the room's serialized
//! path. Every trigger produces exactly one assistant broadcast — a
//! degraded fixed reply if the service fails or times out.

use std::sync::Arc;
use std::time::Duration;

use crate::common::time::Clock;
use crate::domain::{
    FALLBACK_REPLY, GenerationError, GenerationParams, Message, MessageContent, MessagePusher,
    RoomId, TextGenerator, TranscriptTurn, TranscriptStore,
};
use crate::infrastructure::dto::websocket::ServerEvent;
use crate::infrastructure::presence::PresenceRegistry;

use super::room_locks::RoomLocks;

/// System instruction describing assistant behavior in a multi-party
/// chat room.
pub const ASSISTANT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant in a multi-user chat room.\n\
\n\
Guidelines:\n\
- Be helpful, friendly, and engaging\n\
- Keep responses concise but informative\n\
- Address users by their names when mentioned\n\
- Be aware you're in a group chat with multiple participants\n\
- Don't repeat information unnecessarily\n\
- If someone asks a question, provide a clear answer";

const REPLY_PARAMS: GenerationParams = GenerationParams {
    max_tokens: 500,
    temperature: 0.7,
};

/// Timeout and retry bounds for one generation trigger.
#[derive(Debug, Clone, Copy)]
pub struct GenerationPolicy {
    /// Deadline for a single attempt.
    pub timeout: Duration,
    /// Additional attempts after the first; the contract allows at most
    /// one retry before falling back.
    pub retries: u32,
}

impl Default for GenerationPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            retries: 1,
        }
    }
}

/// 生成パイプラインのユースケース
pub struct GenerateReplyUseCase {
    /// TranscriptStore（永続ストアの抽象化）
    store: Arc<dyn TranscriptStore>,
    /// PresenceRegistry（ライブ接続の管理）
    presence: Arc<PresenceRegistry>,
    /// MessagePusher（メッセージ通知の抽象化）
    pusher: Arc<dyn MessagePusher>,
    /// TextGenerator（生成サービスの抽象化）
    generator: Arc<dyn TextGenerator>,
    locks: Arc<RoomLocks>,
    clock: Arc<dyn Clock>,
    policy: GenerationPolicy,
}

impl GenerateReplyUseCase {
    pub fn new(
        store: Arc<dyn TranscriptStore>,
        presence: Arc<PresenceRegistry>,
        pusher: Arc<dyn MessagePusher>,
        generator: Arc<dyn TextGenerator>,
        locks: Arc<RoomLocks>,
        clock: Arc<dyn Clock>,
        policy: GenerationPolicy,
    ) -> Self {
        Self {
            store,
            presence,
            pusher,
            generator,
            locks,
            clock,
            policy,
        }
    }

    /// Run one generation trigger to completion.
    ///
    /// `window` is the transcript window captured at trigger time; it is
    /// stable for this call even if new messages are appended while the
    /// generation is in flight.
    pub async fn run(&self, room_id: RoomId, window: Vec<TranscriptTurn>) {
        let reply = match self.generate_with_retry(&window).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(room_id = %room_id, error = %e, "text generation failed, using fallback reply");
                FALLBACK_REPLY.to_string()
            }
        };

        // Re-enter the room's serialized path for the append + broadcast
        // tail.
        let _guard = self.locks.acquire(&room_id).await;

        let message = Message::assistant(
            room_id.clone(),
            MessageContent::clamp(reply),
            self.clock.now_utc(),
        );

        if let Err(e) = self.store.append(&message).await {
            // Skip the broadcast: neither the transcript nor any client
            // observes the reply, so they stay mutually consistent.
            tracing::error!(room_id = %room_id, error = %e, "failed to persist assistant reply");
            return;
        }

        // Current live set, not the set at trigger time.
        let targets = self.presence.live_connections(&room_id).await;
        let frame = ServerEvent::NewMessage((&message).into()).encode();
        if let Err(e) = self.pusher.broadcast(&targets, &frame).await {
            tracing::warn!(room_id = %room_id, error = %e, "failed to broadcast assistant reply");
        }
    }

    /// 生成サービスを呼び出す（タイムアウトつき、最大 1 回リトライ）
    async fn generate_with_retry(
        &self,
        window: &[TranscriptTurn],
    ) -> Result<String, GenerationError> {
        let mut last_error = GenerationError::Timeout;

        for attempt in 0..=self.policy.retries {
            let call = self
                .generator
                .complete(ASSISTANT_SYSTEM_PROMPT, window, REPLY_PARAMS);
            match tokio::time::timeout(self.policy.timeout, call).await {
                Ok(Ok(text)) if !text.trim().is_empty() => return Ok(text),
                Ok(Ok(_)) => {
                    last_error = GenerationError::Parse("empty completion".to_string());
                }
                Ok(Err(e)) => {
                    last_error = e;
                }
                Err(_) => {
                    last_error = GenerationError::Timeout;
                }
            }
            tracing::warn!(attempt, error = %last_error, "generation attempt failed");
        }

        Err(last_error)
    }
}

//! UseCase: トランスクリプト要約（オンデマンド）
//!
//! Stateless request/response pass-through: read up to 100 recent
//! messages, ask the generation service for a short summary. Generation
//! failure yields a fixed fallback string rather than a raw error.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::{
    GenerationParams, RoomId, TextGenerator, TranscriptStore, TranscriptTurn, TurnRole,
};

use super::error::SummarizeError;

/// System instruction for summarization.
const SUMMARY_SYSTEM_PROMPT: &str = "You are an AI assistant tasked with creating a brief summary of a chat room conversation. \
Create a concise summary (2-3 sentences) of the main topics discussed.";

/// Returned when the room has no transcript yet.
pub const NO_MESSAGES_SUMMARY: &str = "No messages to summarize.";

/// Returned when the generation service fails or times out.
pub const FALLBACK_SUMMARY: &str = "Unable to generate summary at this time.";

const SUMMARY_WINDOW: u32 = 100;

const SUMMARY_PARAMS: GenerationParams = GenerationParams {
    max_tokens: 150,
    temperature: 0.3,
};

/// ルーム要約のユースケース
pub struct SummarizeRoomUseCase {
    /// TranscriptStore（永続ストアの抽象化）
    store: Arc<dyn TranscriptStore>,
    /// TextGenerator（生成サービスの抽象化）
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl SummarizeRoomUseCase {
    pub fn new(store: Arc<dyn TranscriptStore>, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            store,
            generator,
            timeout: Duration::from_secs(15),
        }
    }

    #[cfg(test)]
    fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// ルームの要約を生成する
    pub async fn execute(&self, room_id: &RoomId) -> Result<String, SummarizeError> {
        let messages = self
            .store
            .recent_messages(room_id, SUMMARY_WINDOW)
            .await
            .map_err(SummarizeError::Store)?;

        if messages.is_empty() {
            return Ok(NO_MESSAGES_SUMMARY.to_string());
        }

        let transcript: Vec<String> = messages
            .iter()
            .map(|m| format!("{}: {}", m.username.as_str(), m.content.as_str()))
            .collect();
        let turns = vec![TranscriptTurn {
            role: TurnRole::User,
            content: format!(
                "Please summarize this conversation:\n\n{}",
                transcript.join("\n")
            ),
        }];

        let call = self
            .generator
            .complete(SUMMARY_SYSTEM_PROMPT, &turns, SUMMARY_PARAMS);
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(summary)) if !summary.trim().is_empty() => Ok(summary),
            Ok(Ok(_)) => {
                tracing::warn!(room_id = %room_id, "summary generation returned empty text");
                Ok(FALLBACK_SUMMARY.to_string())
            }
            Ok(Err(e)) => {
                tracing::warn!(room_id = %room_id, error = %e, "summary generation failed");
                Ok(FALLBACK_SUMMARY.to_string())
            }
            Err(_) => {
                tracing::warn!(room_id = %room_id, "summary generation timed out");
                Ok(FALLBACK_SUMMARY.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::generator::MockTextGenerator;
    use crate::domain::{GenerationError, Message, MessageContent, UserId, Username};
    use crate::infrastructure::store::InMemoryTranscriptStore;
    use chrono::{TimeZone, Utc};

    async fn seeded_store() -> Arc<InMemoryTranscriptStore> {
        let store = Arc::new(InMemoryTranscriptStore::new());
        let room = RoomId::new("r1").unwrap();
        let message = Message::user(
            room,
            UserId::new("u1").unwrap(),
            Username::new("alice").unwrap(),
            MessageContent::new("let's plan the release").unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        );
        store.append(&message).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_summary_includes_labeled_transcript() {
        // テスト項目: 要約リクエストに「発言者: 内容」形式の履歴が渡される
        // given (前提条件):
        let store = seeded_store().await;
        let mut generator = MockTextGenerator::new();
        generator
            .expect_complete()
            .withf(|_, turns, _| turns[0].content.contains("alice: let's plan the release"))
            .returning(|_, _, _| Ok("They planned a release.".to_string()));
        let usecase = SummarizeRoomUseCase::new(store, Arc::new(generator));

        // when (操作):
        let summary = usecase.execute(&RoomId::new("r1").unwrap()).await.unwrap();

        // then (期待する結果):
        assert_eq!(summary, "They planned a release.");
    }

    #[tokio::test]
    async fn test_empty_room_short_circuits_without_generation() {
        // テスト項目: 履歴が空なら生成サービスを呼ばずに固定文を返す
        // given (前提条件):
        let store = Arc::new(InMemoryTranscriptStore::new());
        let generator = MockTextGenerator::new(); // 期待なし: 呼ばれたら失敗
        let usecase = SummarizeRoomUseCase::new(store, Arc::new(generator));

        // when (操作):
        let summary = usecase.execute(&RoomId::new("r1").unwrap()).await.unwrap();

        // then (期待する結果):
        assert_eq!(summary, NO_MESSAGES_SUMMARY);
    }

    #[tokio::test]
    async fn test_generation_failure_returns_fallback() {
        // テスト項目: 生成失敗時は固定のフォールバック文を返す
        // given (前提条件):
        let store = seeded_store().await;
        let mut generator = MockTextGenerator::new();
        generator
            .expect_complete()
            .returning(|_, _, _| Err(GenerationError::Api("HTTP 500".to_string())));
        let usecase = SummarizeRoomUseCase::new(store, Arc::new(generator));

        // when (操作):
        let summary = usecase.execute(&RoomId::new("r1").unwrap()).await.unwrap();

        // then (期待する結果):
        assert_eq!(summary, FALLBACK_SUMMARY);
    }

    #[tokio::test]
    async fn test_generation_timeout_returns_fallback() {
        // テスト項目: 生成がタイムアウトした場合もフォールバック文を返す
        // given (前提条件):
        struct PendingGenerator;

        #[async_trait::async_trait]
        impl TextGenerator for PendingGenerator {
            async fn complete(
                &self,
                _system_prompt: &str,
                _turns: &[TranscriptTurn],
                _params: GenerationParams,
            ) -> Result<String, GenerationError> {
                std::future::pending().await
            }
        }

        let store = seeded_store().await;
        let usecase = SummarizeRoomUseCase::new(store, Arc::new(PendingGenerator))
            .with_timeout(Duration::from_millis(20));

        // when (操作):
        let summary = usecase.execute(&RoomId::new("r1").unwrap()).await.unwrap();

        // then (期待する結果):
        assert_eq!(summary, FALLBACK_SUMMARY);
    }
}

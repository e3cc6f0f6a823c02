//! Text-generation service trait.
//!
//! The external generation service is a black-box asynchronous call
//! with unspecified, possibly multi-second latency. Timeout and retry
//! policy belong to the caller, not to implementations of this trait.

use async_trait::async_trait;

use super::entity::TranscriptTurn;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("network error: {0}")]
    Network(String),
    #[error("generation API error: {0}")]
    Api(String),
    #[error("failed to parse generation response: {0}")]
    Parse(String),
    #[error("generation timed out")]
    Timeout,
}

/// Sampling parameters for one completion call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Seam to the external text-generation service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Produce a completion for the given system instruction and
    /// ordered transcript turns.
    async fn complete(
        &self,
        system_prompt: &str,
        turns: &[TranscriptTurn],
        params: GenerationParams,
    ) -> Result<String, GenerationError>;
}

//! OpenAI-compatible chat-completions client.
//!
//! Talks to any `POST {base}/chat/completions` endpoint. The HTTP
//! client carries its own connect/request timeouts; the tighter
//! per-attempt deadline and the retry/fallback policy belong to the
//! generation pipeline, which wraps calls to this client.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::domain::{GenerationError, GenerationParams, TextGenerator, TranscriptTurn, TurnRole};

/// Configuration for the OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Base URL, e.g. `https://api.openai.com/v1`.
    pub api_base: String,
    pub api_key: String,
    pub model: String,
}

/// OpenAI-compatible implementation of [`TextGenerator`].
pub struct OpenAiGenerator {
    config: OpenAiConfig,
    http: reqwest::Client,
}

impl OpenAiGenerator {
    pub fn new(config: OpenAiConfig) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| GenerationError::Network(e.to_string()))?;
        Ok(Self { config, http })
    }

    fn api_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        )
    }

    /// Build the JSON request body for the chat-completions API.
    fn request_body(
        &self,
        system_prompt: &str,
        turns: &[TranscriptTurn],
        params: GenerationParams,
    ) -> Value {
        let mut messages = vec![json!({"role": "system", "content": system_prompt})];
        for turn in turns {
            let role = match turn.role {
                TurnRole::User => "user",
                TurnRole::Assistant => "assistant",
            };
            messages.push(json!({"role": role, "content": turn.content}));
        }

        json!({
            "model": self.config.model,
            "messages": messages,
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn complete(
        &self,
        system_prompt: &str,
        turns: &[TranscriptTurn],
        params: GenerationParams,
    ) -> Result<String, GenerationError> {
        let body = self.request_body(system_prompt, turns, params);

        tracing::debug!(model = %self.config.model, turns = turns.len(), "chat-completions request");

        let response = self
            .http
            .post(self.api_url())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api(format!("HTTP {status}: {text}")));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| GenerationError::Parse(e.to_string()))?;

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                GenerationError::Parse("completion is missing message content".to_string())
            })
    }
}

//! Text-generation service clients.

pub mod openai;

pub use openai::{OpenAiConfig, OpenAiGenerator};

use crate::api_types::{Completion, Message};
use anyhow::Result;
use async_trait::async_trait;
use emoji_like_core::config::LlmConfig;

/// Parameters for LLM completion.
#[derive(Debug, Clone)]
pub struct CompletionParams {
    /// Maximum tokens to generate. A label needs very few.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 - 2.0)
    pub temperature: f32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            max_tokens: 64,
            temperature: 0.2,
        }
    }
}

impl From<&LlmConfig> for CompletionParams {
    fn from(cfg: &LlmConfig) -> Self {
        Self {
            max_tokens: cfg.max_tokens,
            temperature: cfg.temperature,
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a chat completion request and return the assistant text.
    async fn complete(
        &self,
        system: &str,
        messages: Vec<Message>,
        params: CompletionParams,
    ) -> Result<Completion>;
}

// Providers available in crate::providers

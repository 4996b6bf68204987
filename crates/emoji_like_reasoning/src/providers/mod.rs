pub mod mock;
pub mod openai;

use crate::llm::LlmClient;
use anyhow::Result;
use emoji_like_core::config::LlmConfig;
use std::sync::Arc;

pub use mock::MockProvider;
pub use openai::OpenAiClient;

/// Build the provider named in the config.
pub fn create_client(cfg: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    match cfg.provider.as_str() {
        "openai" | "deepseek" | "qwen" | "openai_compatible" => {
            Ok(Arc::new(OpenAiClient::new(cfg)?))
        }
        "mock" => Ok(Arc::new(MockProvider::new(&cfg.model))),
        other => anyhow::bail!("Unknown LLM provider: {}", other),
    }
}

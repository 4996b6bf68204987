//! Mock LLM provider with deterministic responses, for running without API keys.

use crate::api_types::{Completion, Message};
use crate::llm::{CompletionParams, LlmClient};
use anyhow::Result;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug)]
pub struct MockProvider {
    model: String,
    /// Scripted answers, consumed front to back.
    replies: Mutex<VecDeque<String>>,
}

impl MockProvider {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            replies: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_replies<I, S>(model: &str, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            model: model.to_string(),
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for MockProvider {
    async fn complete(
        &self,
        _system: &str,
        _messages: Vec<Message>,
        _params: CompletionParams,
    ) -> Result<Completion> {
        let scripted = self
            .replies
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front();
        let text = scripted
            .unwrap_or_else(|| format!("(Mock {} Response) I received your prompt.", self.model));
        Ok(Completion {
            text,
            stop_reason: Some("stop".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_complete() {
        let provider = MockProvider::new("test-model");
        let resp = provider
            .complete("system", vec![], CompletionParams::default())
            .await
            .unwrap();
        assert!(resp.text.contains("Mock"));
        assert!(resp.text.contains("test-model"));
    }

    #[tokio::test]
    async fn test_mock_scripted_replies() {
        let provider = MockProvider::with_replies("m", ["生气", "无聊"]);
        let params = CompletionParams::default();
        assert_eq!(provider.complete("", vec![], params.clone()).await.unwrap().text, "生气");
        assert_eq!(provider.complete("", vec![], params.clone()).await.unwrap().text, "无聊");
        assert!(provider.complete("", vec![], params).await.unwrap().text.contains("Mock"));
    }
}

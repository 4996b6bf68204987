use anyhow::Result;
use async_trait::async_trait;
use emoji_like_core::SentimentClassifier;
use std::sync::Arc;

use crate::api_types::Message;
use crate::llm::{CompletionParams, LlmClient};

/// Asks a chat model for the emotion label of a message.
pub struct LlmSentimentClassifier {
    client: Arc<dyn LlmClient>,
    params: CompletionParams,
}

impl LlmSentimentClassifier {
    pub fn new(client: Arc<dyn LlmClient>, params: CompletionParams) -> Self {
        Self { client, params }
    }
}

#[async_trait]
impl SentimentClassifier for LlmSentimentClassifier {
    async fn classify(&self, text: &str, system_prompt: &str) -> Result<String> {
        let prompt = format!("这是要分析的文本：{}", text);
        let completion = self
            .client
            .complete(system_prompt, vec![Message::user(prompt)], self.params.clone())
            .await?;
        tracing::debug!("Sentiment label for '{}': {}", text, completion.text);
        Ok(completion.text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_types::{Completion, Role};
    use tokio::sync::Mutex;

    /// Records the prompts it receives.
    struct Capturing {
        seen: Mutex<Vec<(String, Vec<Message>)>>,
    }

    #[async_trait]
    impl LlmClient for Capturing {
        async fn complete(
            &self,
            system: &str,
            messages: Vec<Message>,
            _params: CompletionParams,
        ) -> Result<Completion> {
            self.seen.lock().await.push((system.to_string(), messages));
            Ok(Completion {
                text: "  害羞 \n".to_string(),
                stop_reason: None,
            })
        }
    }

    #[tokio::test]
    async fn test_classify_builds_prompt_and_trims() {
        let client = Arc::new(Capturing {
            seen: Mutex::new(Vec::new()),
        });
        let classifier = LlmSentimentClassifier::new(client.clone(), CompletionParams::default());
        let label = classifier.classify("你好呀", "SYSTEM").await.unwrap();
        assert_eq!(label, "害羞");

        let seen = client.seen.lock().await;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "SYSTEM");
        assert_eq!(seen[0].1[0].role, Role::User);
        assert_eq!(seen[0].1[0].content, "这是要分析的文本：你好呀");
    }
}

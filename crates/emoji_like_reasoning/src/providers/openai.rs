use crate::api_types::{Completion, Message};
use crate::llm::{CompletionParams, LlmClient};
use crate::retry::{with_retry, RetryConfig};
use anyhow::{Context, Result};
use emoji_like_core::config::LlmConfig;
use reqwest::Client;
use serde_json::{json, Value};
use std::env;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Client for any OpenAI-compatible `/chat/completions` endpoint
/// (OpenAI, DeepSeek, Qwen, local vLLM/Ollama gateways).
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    retry: RetryConfig,
}

impl OpenAiClient {
    pub fn new(cfg: &LlmConfig) -> Result<Self> {
        let api_key = cfg
            .api_key
            .clone()
            .or_else(|| env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.is_empty());
        if api_key.is_none() {
            tracing::warn!("No API key configured for the OpenAI provider, sending unauthenticated requests");
        }
        let base_url = cfg
            .base_url
            .clone()
            .or_else(|| env::var("OPENAI_BASE_URL").ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(cfg.timeout_secs))
                .build()
                .context("Failed to build HTTP client")?,
            api_key,
            base_url,
            model: cfg.model.clone(),
            retry: RetryConfig::default(),
        })
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    #[tracing::instrument(skip(self, system, messages, params), fields(model = %self.model))]
    async fn complete(
        &self,
        system: &str,
        messages: Vec<Message>,
        params: CompletionParams,
    ) -> Result<Completion> {
        // OpenAI puts the system prompt in the first message with role "system"
        let mut openai_messages = Vec::with_capacity(messages.len() + 1);
        if !system.is_empty() {
            openai_messages.push(json!({
                "role": "system",
                "content": system
            }));
        }
        for msg in &messages {
            openai_messages.push(json!({
                "role": msg.role.as_str(),
                "content": msg.content
            }));
        }

        let payload = json!({
            "model": self.model,
            "messages": openai_messages,
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
        });

        let url = format!("{}/chat/completions", self.base_url);
        let client = &self.client;
        let api_key = self.api_key.as_deref();

        let response = with_retry(&self.retry, "OpenAI", || async {
            let mut request = client.post(&url).json(&payload);
            if let Some(key) = api_key {
                request = request.bearer_auth(key);
            }
            request
                .send()
                .await
                .context("Failed to send request to OpenAI")
        })
        .await?;

        let resp_json: Value = response
            .json()
            .await
            .context("Failed to parse OpenAI response")?;
        parse_completion(&resp_json)
    }
}

fn parse_completion(resp_json: &Value) -> Result<Completion> {
    let choice = resp_json["choices"]
        .get(0)
        .context("OpenAI response has no choices")?;
    let text = choice["message"]["content"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    let stop_reason = choice["finish_reason"].as_str().map(|s| s.to_string());
    Ok(Completion { text, stop_reason })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_completion() {
        let body = json!({
            "choices": [{
                "message": {"role": "assistant", "content": "开心"},
                "finish_reason": "stop"
            }]
        });
        let completion = parse_completion(&body).unwrap();
        assert_eq!(completion.text, "开心");
        assert_eq!(completion.stop_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn test_parse_completion_without_choices() {
        let err = parse_completion(&json!({"choices": []})).unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }

    #[test]
    fn test_base_url_is_normalised() {
        let cfg = LlmConfig {
            base_url: Some("http://localhost:8000/v1/".to_string()),
            api_key: Some("k".to_string()),
            ..Default::default()
        };
        let client = OpenAiClient::new(&cfg).unwrap();
        assert_eq!(client.base_url, "http://localhost:8000/v1");
        assert_eq!(client.model(), "gpt-4o-mini");
    }
}

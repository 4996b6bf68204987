//! HTTP-level tests for the OpenAI-compatible provider against a local mock server.

use emoji_like_core::config::LlmConfig;
use emoji_like_core::SentimentClassifier;
use emoji_like_reasoning::api_types::Message;
use emoji_like_reasoning::providers::OpenAiClient;
use emoji_like_reasoning::retry::RetryConfig;
use emoji_like_reasoning::{CompletionParams, LlmClient, LlmSentimentClassifier};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn answer(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }]
    }))
}

fn client_for(server: &MockServer) -> OpenAiClient {
    let cfg = LlmConfig {
        base_url: Some(format!("{}/v1", server.uri())),
        api_key: Some("sk-test".to_string()),
        model: "test-model".to_string(),
        ..Default::default()
    };
    OpenAiClient::new(&cfg)
        .unwrap()
        .with_retry_config(RetryConfig::immediate(3))
}

#[tokio::test]
async fn test_complete_sends_system_and_user_messages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "messages": [
                {"role": "system", "content": "SYS"},
                {"role": "user", "content": "hello"}
            ]
        })))
        .respond_with(answer("开心"))
        .expect(1)
        .mount(&server)
        .await;

    let completion = client_for(&server)
        .complete("SYS", vec![Message::user("hello")], CompletionParams::default())
        .await
        .unwrap();
    assert_eq!(completion.text, "开心");
    assert_eq!(completion.stop_reason.as_deref(), Some("stop"));
}

#[tokio::test]
async fn test_transient_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(answer("无语"))
        .mount(&server)
        .await;

    let completion = client_for(&server)
        .complete("", vec![Message::user("x")], CompletionParams::default())
        .await
        .unwrap();
    assert_eq!(completion.text, "无语");
}

#[tokio::test]
async fn test_client_errors_fail_fast() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .complete("", vec![Message::user("x")], CompletionParams::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("401"));
}

#[tokio::test]
async fn test_classifier_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "messages": [
                {"role": "system", "content": "labels"},
                {"role": "user", "content": "这是要分析的文本：气死我了"}
            ]
        })))
        .respond_with(answer(" 生气 "))
        .mount(&server)
        .await;

    let classifier =
        LlmSentimentClassifier::new(Arc::new(client_for(&server)), CompletionParams::default());
    let label = classifier.classify("气死我了", "labels").await.unwrap();
    assert_eq!(label, "生气");
}

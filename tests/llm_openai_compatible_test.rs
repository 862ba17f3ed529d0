// ABOUTME: Integration tests for the OpenAI-compatible provider against a mock HTTP server
// ABOUTME: Covers streaming, auth header, error statuses, malformed chunks, and blocking chat
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use chatline_core::errors::ErrorCode;
use chatline_server::config::{LlmConfig, LlmProviderType};
use chatline_server::llm::{
    ChatMessage, ChatRequest, LlmProvider, OpenAiCompatibleConfig, OpenAiCompatibleProvider,
    StreamDelta,
};
use futures_util::StreamExt;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider_for(server: &MockServer) -> OpenAiCompatibleProvider {
    let mut llm = LlmConfig::for_provider(LlmProviderType::OpenAi);
    llm.base_url = server.uri();
    llm.api_key = Some("test-key".to_owned());
    llm.model = "test-model".to_owned();
    OpenAiCompatibleProvider::new(OpenAiCompatibleConfig::from_llm_config(&llm)).unwrap()
}

fn request() -> ChatRequest {
    ChatRequest::new(vec![ChatMessage::system("rules"), ChatMessage::user("Hi")])
}

fn sse(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body)
}

#[tokio::test]
async fn test_stream_yields_text_then_usage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "stream": true,
            "stream_options": { "include_usage": true },
            "messages": [
                { "role": "system", "content": "rules" },
                { "role": "user", "content": "Hi" }
            ]
        })))
        .respond_with(sse(concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"A\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"B\"}}]}\n\n",
            "data: {\"choices\":[],\"usage\":{\"prompt_tokens\":10,\"completion_tokens\":2}}\n\n",
            "data: [DONE]\n\n",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    assert_eq!(provider.name(), "openai");

    let deltas: Vec<StreamDelta> = provider
        .stream_chat(&request())
        .await
        .unwrap()
        .map(Result::unwrap)
        .collect()
        .await;

    assert_eq!(
        deltas,
        vec![
            StreamDelta::text("A"),
            StreamDelta::text("B"),
            StreamDelta::usage(10, 2),
        ]
    );
}

#[tokio::test]
async fn test_error_status_fails_before_streaming() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({ "error": { "message": "upstream exploded" } })),
        )
        .mount(&server)
        .await;

    let error = provider_for(&server)
        .stream_chat(&request())
        .await
        .err()
        .unwrap();
    assert_eq!(error.code, ErrorCode::LlmProviderError);
    assert!(error.message.contains("upstream exploded"));
}

#[tokio::test]
async fn test_upstream_rate_limit_is_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let error = provider_for(&server)
        .stream_chat(&request())
        .await
        .err()
        .unwrap();
    assert_eq!(error.code, ErrorCode::LlmProviderError);
    assert!(error.message.contains("rate limit"));
}

#[tokio::test]
async fn test_malformed_chunk_ends_stream_with_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(sse(concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"A\"}}]}\n\n",
            "data: {broken\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"never\"}}]}\n\n",
        )))
        .mount(&server)
        .await;

    let items: Vec<_> = provider_for(&server)
        .stream_chat(&request())
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap(), &StreamDelta::text("A"));
    assert_eq!(
        items[1].as_ref().unwrap_err().code,
        ErrorCode::LlmStreamError
    );
}

#[tokio::test]
async fn test_blocking_chat_returns_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "stream": false, "model": "other-model" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "full reply" } }],
            "usage": { "prompt_tokens": 3, "completion_tokens": 2 }
        })))
        .mount(&server)
        .await;

    let reply = provider_for(&server)
        .chat(&request().with_model("other-model"))
        .await
        .unwrap();
    assert_eq!(reply, "full reply");
}

// ABOUTME: Integration tests for the HTTP surface driven through the axum router
// ABOUTME: Covers caller identity, chat CRUD, SSE streaming with the mock provider, and errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chatline_core::models::UserId;
use chatline_server::database::SqliteStore;
use chatline_server::llm::{LlmProvider, MockProvider};
use chatline_server::config::OrchestrationConfig;
use chatline_server::orchestrator::OrchestratorSettings;
use chatline_server::server::{build_router, ServerResources};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn test_router() -> Router {
    common::init_test_logging();
    let store = Arc::new(SqliteStore::connect("sqlite::memory:").await.unwrap());
    let provider: Arc<dyn LlmProvider> = Arc::new(
        MockProvider::default()
            .with_reply("Hi there")
            .with_char_delay(Duration::ZERO),
    );
    let resources = ServerResources::new(store, provider, OrchestratorSettings::default());
    build_router(Arc::new(resources))
}

fn request(method: Method, uri: &str, user: Option<UserId>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user.to_string());
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn send_json(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(router, request).await;
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, value)
}

async fn create_chat(router: &Router, user: UserId, title: &str) -> String {
    let (status, body) = send_json(
        router,
        request(
            Method::POST,
            "/api/chats",
            Some(user),
            Some(json!({ "title": title })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_owned()
}

#[tokio::test]
async fn test_health_endpoints() {
    let router = test_router().await;

    let (status, body) = send_json(&router, request(Method::GET, "/api/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "UP");
    assert_eq!(body["provider"], "mock");

    let defaults = OrchestrationConfig::default();
    assert_eq!(body["workers"]["size"], defaults.worker_pool_size);
    assert_eq!(
        body["workers"]["capacity"],
        defaults.worker_pool_size + defaults.queue_depth
    );
    assert_eq!(body["workers"]["active"], 0);
    assert_eq!(body["workers"]["inFlight"], 0);

    let (status, body) = send(&router, request(Method::GET, "/api/health/ping", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"pong");
}

#[tokio::test]
async fn test_trace_id_is_echoed_on_response() {
    let router = test_router().await;
    let mut req = request(Method::GET, "/api/chats", None, None);
    req.headers_mut()
        .insert("x-trace-id", "trace-abc-123".parse().unwrap());

    let response = router.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()["x-trace-id"], "trace-abc-123");
}

#[tokio::test]
async fn test_trace_id_is_generated_when_absent() {
    let router = test_router().await;
    let user = UserId::new();
    let chat_id = create_chat(&router, user, "traced").await;

    let response = router
        .clone()
        .oneshot(request(
            Method::POST,
            &format!("/api/chats/{chat_id}/messages:stream"),
            Some(user),
            Some(json!({ "content": "Hello" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let trace_id = response.headers()["x-trace-id"].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(trace_id).is_ok(), "{trace_id}");
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let router = test_router().await;
    let (status, body) = send_json(&router, request(Method::GET, "/api/chats", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTH_REQUIRED");
}

#[tokio::test]
async fn test_chat_crud_round() {
    let router = test_router().await;
    let user = UserId::new();

    let (status, created) = send_json(
        &router,
        request(Method::POST, "/api/chats", Some(user), None),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["title"], "New Chat");
    let chat_id = created["id"].as_str().unwrap().to_owned();
    let chat_uri = format!("/api/chats/{chat_id}");

    let (status, renamed) = send_json(
        &router,
        request(
            Method::PATCH,
            &chat_uri,
            Some(user),
            Some(json!({ "title": "Recipes" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["title"], "Recipes");

    let (status, listed) =
        send_json(&router, request(Method::GET, "/api/chats", Some(user), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, detail) = send_json(&router, request(Method::GET, &chat_uri, Some(user), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["id"], chat_id.as_str());
    assert!(detail["messages"].as_array().unwrap().is_empty());

    let (status, _) = send(&router, request(Method::DELETE, &chat_uri, Some(user), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send_json(&router, request(Method::GET, &chat_uri, Some(user), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "CHAT_NOT_FOUND");
}

#[tokio::test]
async fn test_other_users_chat_is_not_visible() {
    let router = test_router().await;
    let owner = UserId::new();
    let chat_id = create_chat(&router, owner, "private").await;

    let (status, body) = send_json(
        &router,
        request(
            Method::GET,
            &format!("/api/chats/{chat_id}"),
            Some(UserId::new()),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "CHAT_NOT_FOUND");
}

#[tokio::test]
async fn test_blank_rename_is_validation_failure() {
    let router = test_router().await;
    let user = UserId::new();
    let chat_id = create_chat(&router, user, "keep").await;

    let (status, body) = send_json(
        &router,
        request(
            Method::PATCH,
            &format!("/api/chats/{chat_id}"),
            Some(user),
            Some(json!({ "title": "   " })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn test_stream_endpoint_relays_reply_and_persists_it() {
    let router = test_router().await;
    let user = UserId::new();
    let chat_id = create_chat(&router, user, "stream").await;

    let (status, body) = send(
        &router,
        request(
            Method::POST,
            &format!("/api/chats/{chat_id}/messages:stream"),
            Some(user),
            Some(json!({ "content": "Hello" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("event: delta"));
    assert!(text.contains("event: done"));
    assert!(!text.contains("event: error"));
    assert_eq!(text.matches("event: done").count(), 1);

    let (_, detail) = send_json(
        &router,
        request(Method::GET, &format!("/api/chats/{chat_id}"), Some(user), None),
    )
    .await;
    let messages = detail["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["content"], "Hello");
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[1]["content"], "Hi there");
    assert_eq!(messages[1]["provider"], "mock");
}

#[tokio::test]
async fn test_stream_for_foreign_chat_emits_error_event() {
    let router = test_router().await;
    let chat_id = create_chat(&router, UserId::new(), "mine").await;

    let (status, body) = send(
        &router,
        request(
            Method::POST,
            &format!("/api/chats/{chat_id}/messages:stream"),
            Some(UserId::new()),
            Some(json!({ "content": "let me in" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("event: error"));
    assert!(text.contains("CHAT_NOT_FOUND"));
    assert!(!text.contains("event: delta"));
}

#[tokio::test]
async fn test_malformed_stream_body_is_bad_request() {
    let router = test_router().await;
    let user = UserId::new();
    let chat_id = create_chat(&router, user, "bad").await;

    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/chats/{chat_id}/messages:stream"))
        .header("x-user-id", user.to_string())
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send_json(&router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_unknown_chat_action_is_not_found() {
    let router = test_router().await;
    let user = UserId::new();
    let chat_id = create_chat(&router, user, "actions").await;

    let (status, body) = send_json(
        &router,
        request(
            Method::POST,
            &format!("/api/chats/{chat_id}/messages:rewind"),
            Some(user),
            Some(json!({})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

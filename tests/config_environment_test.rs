// ABOUTME: Integration tests for environment-driven server configuration
// ABOUTME: Runs serially since each test mutates process environment variables
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::env;

use chatline_server::config::{LlmProviderType, ServerConfig};
use serial_test::serial;

const VARS: &[&str] = &[
    "HTTP_PORT",
    "DATABASE_URL",
    "LLM_PROVIDER",
    "LLM_API_KEY",
    "LLM_BASE_URL",
    "LLM_MODEL",
    "LLM_TEMPERATURE",
    "LLM_TOP_P",
    "LLM_MAX_TOKENS",
    "LLM_MAX_COMPLETION_TOKENS",
    "LLM_REASONING_EFFORT",
    "RATE_LIMIT_ENABLED",
    "RATE_LIMIT_MAX_REQUESTS",
    "RATE_LIMIT_WINDOW_SECS",
    "WORKER_POOL_SIZE",
    "WORKER_QUEUE_DEPTH",
    "RUN_TIMEOUT_SECS",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_mock_provider_loads_with_defaults() {
    clear_env();
    env::set_var("LLM_PROVIDER", "mock");

    let config = ServerConfig::from_env().unwrap();
    assert_eq!(config.llm.provider, LlmProviderType::Mock);
    assert_eq!(config.llm.model, "mock-echo");
    assert_eq!(config.http_port, 8081);
    assert!(config.rate_limit.enabled);
    assert_eq!(config.rate_limit.max_requests, 30);
    assert_eq!(config.orchestration.worker_pool_size, 16);

    clear_env();
}

#[test]
#[serial]
fn test_overrides_are_parsed() {
    clear_env();
    env::set_var("LLM_PROVIDER", "groq");
    env::set_var("LLM_API_KEY", "  gsk-test  ");
    env::set_var("LLM_BASE_URL", "http://localhost:9999/v1/");
    env::set_var("LLM_MAX_COMPLETION_TOKENS", "512");
    env::set_var("RATE_LIMIT_MAX_REQUESTS", "5");
    env::set_var("RUN_TIMEOUT_SECS", "30");

    let config = ServerConfig::from_env().unwrap();
    assert_eq!(config.llm.provider, LlmProviderType::Groq);
    assert_eq!(config.llm.api_key.as_deref(), Some("gsk-test"));
    assert_eq!(config.llm.base_url, "http://localhost:9999/v1");
    assert_eq!(config.llm.model, "llama-3.1-8b-instant");
    assert_eq!(config.llm.max_completion_tokens, Some(512));
    assert_eq!(config.rate_limit.max_requests, 5);
    assert_eq!(config.orchestration.run_timeout_secs, 30);

    clear_env();
}

#[test]
#[serial]
fn test_http_provider_without_key_is_rejected() {
    clear_env();
    env::set_var("LLM_PROVIDER", "openai");

    let error = ServerConfig::from_env().unwrap_err();
    assert!(error.to_string().contains("LLM_API_KEY"));

    clear_env();
}

#[test]
#[serial]
fn test_unparseable_number_is_rejected() {
    clear_env();
    env::set_var("LLM_PROVIDER", "mock");
    env::set_var("WORKER_POOL_SIZE", "many");

    let error = ServerConfig::from_env().unwrap_err();
    assert!(error.to_string().contains("WORKER_POOL_SIZE"));

    clear_env();
}

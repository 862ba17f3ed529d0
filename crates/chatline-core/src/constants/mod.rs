// ABOUTME: Constants module with domain-separated organization
// ABOUTME: Defaults for providers, admission, worker pool, limits, and wire names
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

//! Constants module
//!
//! Defaults for every configurable value live here so that configuration
//! loading, tests, and documentation agree on a single source.

/// Network ports
pub mod ports {
    /// Default HTTP port
    pub const DEFAULT_HTTP_PORT: u16 = 8081;
}

/// Storage defaults
pub mod database {
    /// Default SQLite database URL
    pub const DEFAULT_DATABASE_URL: &str = "sqlite:./data/chatline.db";
    /// Title given to chats created without one
    pub const DEFAULT_CHAT_TITLE: &str = "New Chat";
}

/// Upstream model provider defaults
pub mod llm {
    /// Provider used when `LLM_PROVIDER` is unset
    pub const DEFAULT_PROVIDER: &str = "openai";
    /// `OpenAI` API base URL
    pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
    /// `OpenAI` default model
    pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";
    /// Groq API base URL (OpenAI-compatible)
    pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
    /// Groq default model
    pub const GROQ_DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
    /// Model name reported by the offline mock provider
    pub const MOCK_DEFAULT_MODEL: &str = "mock-echo";
    /// Default sampling temperature
    pub const DEFAULT_TEMPERATURE: f32 = 0.7;
    /// Default nucleus sampling value
    pub const DEFAULT_TOP_P: f32 = 1.0;
    /// Default completion token cap
    pub const DEFAULT_MAX_TOKENS: u32 = 4096;
    /// Upper bound accepted for temperature
    pub const MAX_TEMPERATURE: f32 = 2.0;
    /// TCP connect timeout for provider requests
    pub const CONNECT_TIMEOUT_SECS: u64 = 10;
    /// Per-request timeout for provider requests
    pub const REQUEST_TIMEOUT_SECS: u64 = 60;
    /// Path appended to the provider base URL
    pub const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";
    /// Delay between characters emitted by the mock provider
    pub const MOCK_CHAR_DELAY_MS: u64 = 50;
}

/// Admission control defaults
pub mod rate_limit {
    /// Admission control enabled by default
    pub const DEFAULT_ENABLED: bool = true;
    /// Requests allowed per window
    pub const DEFAULT_MAX_REQUESTS: u32 = 30;
    /// Window length in seconds
    pub const DEFAULT_WINDOW_SECS: u64 = 60;
}

/// Orchestration worker pool and run lifetime
pub mod orchestration {
    /// Concurrent runs
    pub const DEFAULT_WORKER_POOL_SIZE: usize = 16;
    /// Runs allowed to wait for a worker
    pub const DEFAULT_QUEUE_DEPTH: usize = 100;
    /// Hard limit on total run time
    pub const DEFAULT_RUN_TIMEOUT_SECS: u64 = 300;
    /// Interval between SSE keep-alive comments
    pub const SSE_KEEP_ALIVE_SECS: u64 = 15;
}

/// Request limits
pub mod limits {
    /// Maximum characters in a single user message
    pub const MAX_MESSAGE_CHARS: usize = 32_000;
    /// Maximum characters in a chat title
    pub const MAX_TITLE_CHARS: usize = 255;
}

/// Stream event names
pub mod events {
    /// Incremental text fragment
    pub const DELTA: &str = "delta";
    /// Successful completion
    pub const DONE: &str = "done";
    /// Terminal failure
    pub const ERROR: &str = "error";
}

/// HTTP header names
pub mod headers {
    /// Pre-authenticated caller identity injected by the gateway
    pub const USER_ID: &str = "x-user-id";
    /// Request correlation id, echoed on every response
    pub const TRACE_ID: &str = "x-trace-id";
}

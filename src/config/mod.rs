// ABOUTME: Configuration management module for server settings read at startup
// ABOUTME: Covers provider selection, admission limits, worker pool sizing, and run timeout
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

//! Configuration module
//!
//! - **environment**: `ServerConfig` loaded from environment variables
//! - **types**: provider selection enum and its defaults

/// Environment and server configuration
pub mod environment;
/// Configuration type definitions
pub mod types;

pub use environment::{LlmConfig, OrchestrationConfig, RateLimitConfig, ServerConfig};
pub use types::LlmProviderType;

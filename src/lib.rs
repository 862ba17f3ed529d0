// ABOUTME: Main library entry point for the Chatline streaming chat backend
// ABOUTME: Exposes configuration, providers, orchestration, storage, and HTTP routes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

#![deny(unsafe_code)]

//! # Chatline Server
//!
//! A multi-user chat backend that relays a model's reply to the client as it
//! is generated.
//!
//! ## Features
//!
//! - **Streaming replies**: one SSE event per model fragment, then exactly one
//!   `done` or `error` event
//! - **Pluggable providers**: `OpenAI`-compatible HTTP APIs (`OpenAI`, Groq) and
//!   an offline mock, selected once at startup
//! - **Admission control**: per-user fixed-window rate limiting
//! - **Usage accounting**: one token-usage row per completed reply
//! - **Bounded execution**: a fixed worker pool with a bounded backlog and a
//!   hard run timeout
//!
//! ## Architecture
//!
//! - **Orchestrator**: drives a run from admission to its terminal event
//! - **LLM**: provider trait, wire parsing, and prompt assembly
//! - **Database**: message and usage stores backed by `SQLite`
//! - **Routes**: thin axum handlers over the orchestrator and store
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use chatline_server::config::ServerConfig;
//! use chatline_server::server::{serve, ServerResources};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!     let resources = ServerResources::from_config(&config).await?;
//!     serve(resources, config.http_port, async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//!     Ok(())
//! }
//! ```

/// Environment-driven server configuration
pub mod config;

/// Message and usage storage
pub mod database;

/// Error taxonomy re-exported from `chatline-core`
pub mod errors;

/// LLM provider abstraction, wire parsing, and prompt assembly
pub mod llm;

/// Structured logging setup and run outcome logging
pub mod logging;

/// Streaming orchestrator
pub mod orchestrator;

/// Per-user admission control
pub mod rate_limiting;

/// HTTP route handlers
pub mod routes;

/// Router assembly and serve loop
pub mod server;

/// Best-effort usage ledger
pub mod usage;

pub use chatline_core::models;

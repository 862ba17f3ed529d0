// ABOUTME: LLM provider abstraction layer for pluggable upstream model integration
// ABOUTME: Defines the provider contract, request types, and the StreamDelta fragment
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

//! # LLM Provider Interface
//!
//! This module defines the contract every upstream model provider implements,
//! plus the prompt assembler that feeds it.
//!
//! ## Key Concepts
//!
//! - **`LlmProvider`**: Async trait with a streaming and a blocking completion
//! - **`StreamDelta`**: One provider-emitted fragment (text and/or final usage)
//! - **`ChatStream`**: Lazy, finite, non-restartable sequence of deltas
//! - **`ChatProvider`**: The variant selected once at startup from configuration
//!
//! ## Example: Using a Provider
//!
//! ```rust,no_run
//! use chatline_server::llm::{ChatMessage, ChatRequest, LlmProvider};
//! use futures_util::StreamExt;
//!
//! async fn example(provider: &dyn LlmProvider) {
//!     let request = ChatRequest::new(vec![
//!         ChatMessage::system("You are a helpful assistant."),
//!         ChatMessage::user("Hello"),
//!     ])
//!     .with_temperature(0.2);
//!
//!     if let Ok(mut stream) = provider.stream_chat(&request).await {
//!         while let Some(Ok(delta)) = stream.next().await {
//!             print!("{}", delta.text.unwrap_or_default());
//!         }
//!     }
//! }
//! ```

mod mock;
mod openai_compatible;
/// Prompt assembly from conversation history
pub mod prompts;
mod provider;
/// Line-buffered SSE parsing shared by HTTP providers
pub mod sse_parser;

pub use mock::MockProvider;
pub use openai_compatible::{OpenAiCompatibleConfig, OpenAiCompatibleProvider};
pub use prompts::PromptAssembler;
pub use provider::ChatProvider;

use std::pin::Pin;

use async_trait::async_trait;
use chatline_core::models::{ConversationTurn, MessageRole, TokenUsage};
use serde::{Deserialize, Serialize};
use tokio_stream::Stream;

use crate::errors::AppResult;

// ============================================================================
// Message Types
// ============================================================================

/// A single message in the provider's message-list format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender
    pub role: MessageRole,
    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    /// Create a new chat message
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

impl From<&ConversationTurn> for ChatMessage {
    fn from(turn: &ConversationTurn) -> Self {
        Self::new(turn.role, turn.content.clone())
    }
}

// ============================================================================
// Request Types
// ============================================================================

/// Configuration for a chat completion request
///
/// Unset fields fall back to the provider's configured defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Conversation messages
    pub messages: Vec<ChatMessage>,
    /// Model identifier (provider-specific)
    pub model: Option<String>,
    /// Temperature for response randomness (0.0 - 2.0)
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Create a new chat request with messages
    #[must_use]
    pub const fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set the model to use
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the temperature
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the maximum tokens
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

// ============================================================================
// Streaming Types
// ============================================================================

/// A provider-emitted fragment of a streaming completion
///
/// Token counts, when present, are cumulative totals reported by the
/// provider rather than increments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDelta {
    /// Text to append to the reply
    pub text: Option<String>,
    /// Prompt tokens reported so far
    pub input_tokens: Option<u32>,
    /// Completion tokens reported so far
    pub output_tokens: Option<u32>,
}

impl StreamDelta {
    /// Text-only fragment
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Usage-only fragment
    #[must_use]
    pub const fn usage(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            text: None,
            input_tokens: Some(input_tokens),
            output_tokens: Some(output_tokens),
        }
    }

    /// Non-empty text carried by this fragment
    #[must_use]
    pub fn text_fragment(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }

    /// Whether the fragment reports any token count
    #[must_use]
    pub const fn has_usage(&self) -> bool {
        self.input_tokens.is_some() || self.output_tokens.is_some()
    }

    /// Token counts with absent values defaulted to zero
    #[must_use]
    pub fn usage_or_zero(&self) -> TokenUsage {
        TokenUsage::from_partial(self.input_tokens, self.output_tokens)
    }

    /// Whether the fragment carries neither text nor usage
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text_fragment().is_none() && !self.has_usage()
    }
}

/// Stream type for chat completion responses
pub type ChatStream = Pin<Box<dyn Stream<Item = AppResult<StreamDelta>> + Send>>;

// ============================================================================
// Provider Trait
// ============================================================================

/// LLM provider trait for chat completion
///
/// Implementations make exactly one network attempt per call. A stream that
/// fails is never resumed; a retry has to issue a new request.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Unique provider identifier recorded on messages and usage rows
    fn name(&self) -> &'static str;

    /// Human-readable display name for the provider
    fn display_name(&self) -> &'static str;

    /// Default model to use if not specified in request
    fn default_model(&self) -> &str;

    /// Open a streaming completion
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent or the provider answers
    /// with a non-success status. Later failures surface as `Err` items.
    async fn stream_chat(&self, request: &ChatRequest) -> AppResult<ChatStream>;

    /// Perform a blocking completion and return the full reply text
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-success status, or an
    /// undecodable response body
    async fn chat(&self, request: &ChatRequest) -> AppResult<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_does_not_count_as_content() {
        let delta = StreamDelta::text("");
        assert!(delta.text_fragment().is_none());
        assert!(delta.is_empty());
    }

    #[test]
    fn test_partial_usage_defaults_to_zero() {
        let delta = StreamDelta {
            text: None,
            input_tokens: Some(12),
            output_tokens: None,
        };
        assert!(delta.has_usage());
        assert_eq!(delta.usage_or_zero(), TokenUsage::new(12, 0));
    }
}

// ABOUTME: Offline LLM provider that streams a canned reply character by character
// ABOUTME: Lets the server run end to end without network access or an API key
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use chatline_core::constants::llm;
use tokio::time::sleep;
use tracing::debug;

use super::{ChatRequest, ChatStream, LlmProvider, StreamDelta};
use crate::errors::AppResult;

/// Reply streamed by the mock provider
const MOCK_REPLY: &str = "This is a simulated assistant reply. Configure LLM_PROVIDER \
                          to connect a real model and stream generated content instead.";

/// Rough characters-per-token ratio used for simulated usage
const CHARS_PER_TOKEN: usize = 4;

/// Provider that streams a fixed reply with a per-character delay
#[derive(Debug, Clone)]
pub struct MockProvider {
    model: String,
    reply: String,
    char_delay: Duration,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            model: llm::MOCK_DEFAULT_MODEL.to_owned(),
            reply: MOCK_REPLY.to_owned(),
            char_delay: Duration::from_millis(llm::MOCK_CHAR_DELAY_MS),
        }
    }
}

impl MockProvider {
    /// Mock provider reporting the given default model
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// Replace the canned reply
    #[must_use]
    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = reply.into();
        self
    }

    /// Replace the delay between characters
    #[must_use]
    pub const fn with_char_delay(mut self, delay: Duration) -> Self {
        self.char_delay = delay;
        self
    }

    fn estimate_tokens(text: &str) -> u32 {
        text.chars().count().div_ceil(CHARS_PER_TOKEN) as u32
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn display_name(&self) -> &'static str {
        "Mock (Offline)"
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn stream_chat(&self, request: &ChatRequest) -> AppResult<ChatStream> {
        debug!(
            messages = request.messages.len(),
            "Starting mock stream"
        );
        let prompt_tokens: u32 = request
            .messages
            .iter()
            .map(|m| Self::estimate_tokens(&m.content))
            .sum();
        let reply = self.reply.clone();
        let delay = self.char_delay;

        let deltas = stream! {
            for ch in reply.chars() {
                sleep(delay).await;
                yield Ok(StreamDelta::text(ch.to_string()));
            }
            yield Ok(StreamDelta::usage(prompt_tokens, Self::estimate_tokens(&reply)));
        };
        Ok(Box::pin(deltas))
    }

    async fn chat(&self, _request: &ChatRequest) -> AppResult<String> {
        Ok(self.reply.clone())
    }
}

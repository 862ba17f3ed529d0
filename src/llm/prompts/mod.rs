// ABOUTME: Prompt assembly turning persisted chat history into provider message lists
// ABOUTME: Loads the assistant system prompt at compile time from a markdown file
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

//! # Prompt Assembly
//!
//! Every provider request starts with exactly one `system` message holding the
//! assistant instructions. The prompt text lives in a markdown file so it can
//! be edited without touching code.

use chatline_core::models::{ConversationTurn, MessageRole};

use super::ChatMessage;

/// Assistant system prompt
pub const ASSISTANT_SYSTEM_PROMPT: &str = include_str!("assistant_system.md");

/// Separator placed between the instructions and optional extra context
const CONTEXT_HEADER: &str = "\n\nRelevant context:\n";

/// Builds provider message lists from conversation history
///
/// Assembly is a pure transformation: no I/O, no state beyond the
/// instruction text.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    system_prompt: String,
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::new(ASSISTANT_SYSTEM_PROMPT)
    }
}

impl PromptAssembler {
    /// Assembler using custom system instructions
    #[must_use]
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
        }
    }

    /// The fixed system instructions
    #[must_use]
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Build the message list for a persisted conversation
    ///
    /// The first element is always the system message. Non-blank
    /// `extra_context` is appended to the instructions; the history follows
    /// one message per turn in the given order.
    #[must_use]
    pub fn build(
        &self,
        history: &[ConversationTurn],
        extra_context: Option<&str>,
    ) -> Vec<ChatMessage> {
        let system = match extra_context.filter(|ctx| !ctx.trim().is_empty()) {
            Some(ctx) => format!("{}{CONTEXT_HEADER}{ctx}", self.system_prompt),
            None => self.system_prompt.clone(),
        };

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::system(system));
        messages.extend(history.iter().map(ChatMessage::from));
        messages
    }

    /// Build from an already role-tagged list, inserting the system message
    /// at index 0 only when none is present
    #[must_use]
    pub fn build_from_raw(&self, messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
        if messages.iter().any(|m| m.role == MessageRole::System) {
            return messages;
        }

        let mut prompt = Vec::with_capacity(messages.len() + 1);
        prompt.push(ChatMessage::system(self.system_prompt.clone()));
        prompt.extend(messages);
        prompt
    }
}

// ABOUTME: Client-facing stream events emitted by an orchestration run
// ABOUTME: Serializes as one tagged JSON object per event for SSE delivery
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

use chatline_core::constants::events;
use chatline_core::errors::ErrorCode;
use chatline_core::models::TokenUsage;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// One event on a run's output channel
///
/// A run emits any number of `Delta` events followed by exactly one
/// terminal `Done` or `Error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    /// Incremental reply text
    Delta {
        /// Fragment to append
        text: String,
    },
    /// Successful completion with final token counts
    #[serde(rename_all = "camelCase")]
    Done {
        /// Prompt tokens
        input_tokens: u32,
        /// Completion tokens
        output_tokens: u32,
    },
    /// Failed run
    Error {
        /// Stable machine-readable code
        code: ErrorCode,
        /// Human-readable message
        message: String,
    },
}

impl StreamEvent {
    /// Delta event
    #[must_use]
    pub fn delta(text: impl Into<String>) -> Self {
        Self::Delta { text: text.into() }
    }

    /// Done event carrying final usage
    #[must_use]
    pub const fn done(usage: TokenUsage) -> Self {
        Self::Done {
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
        }
    }

    /// Error event for a failure
    #[must_use]
    pub fn error(error: &AppError) -> Self {
        Self::Error {
            code: error.code,
            message: error.message.clone(),
        }
    }

    /// SSE event name, identical to the `type` tag
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Delta { .. } => events::DELTA,
            Self::Done { .. } => events::DONE,
            Self::Error { .. } => events::ERROR,
        }
    }

    /// Whether this event ends the run
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Delta { .. })
    }

    /// JSON payload for the SSE `data` field
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"type":"error","code":"INTERNAL_ERROR","message":"event encoding failed: {e}"}}"#
            )
        })
    }
}

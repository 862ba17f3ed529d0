// ABOUTME: Token accounting types for completed orchestration runs
// ABOUTME: UsageRecord is an immutable ledger row, TokenUsage the final counts pair
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ChatId, MessageId, UserId};

/// Final prompt/completion token counts of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    /// Prompt tokens
    pub input_tokens: u32,
    /// Completion tokens
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Create a usage pair
    #[must_use]
    pub const fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    /// Fill absent counts with zero
    #[must_use]
    pub fn from_partial(input_tokens: Option<u32>, output_tokens: Option<u32>) -> Self {
        Self::new(input_tokens.unwrap_or(0), output_tokens.unwrap_or(0))
    }
}

/// Immutable usage ledger row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Billed user
    pub user_id: UserId,
    /// Chat the run belonged to
    pub chat_id: ChatId,
    /// Assistant message produced by the run
    pub message_id: MessageId,
    /// Provider name
    pub provider: String,
    /// Model name
    pub model: String,
    /// Prompt tokens
    pub token_in: u32,
    /// Completion tokens
    pub token_out: u32,
    /// Record time
    pub created_at: DateTime<Utc>,
}

// ABOUTME: Best-effort usage ledger recording token counts for completed runs
// ABOUTME: Storage failures are logged and never reach the client
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

//! # Usage Ledger
//!
//! One row per completed run: `(user, chat, message, provider, model,
//! token_in, token_out)`. Missing token counts are recorded as zero.

use std::sync::Arc;

use chatline_core::models::{ChatId, MessageId, TokenUsage, UsageRecord, UserId};
use chrono::Utc;
use tracing::{debug, warn};

use crate::database::UsageStore;

/// Append-only recorder of token usage
#[derive(Clone)]
pub struct UsageLedger {
    store: Arc<dyn UsageStore>,
}

impl UsageLedger {
    /// Create a ledger writing to `store`
    #[must_use]
    pub fn new(store: Arc<dyn UsageStore>) -> Self {
        Self { store }
    }

    /// Record usage for one run
    ///
    /// Returns whether the row was written. A failed write is logged at
    /// `warn` and otherwise ignored.
    pub async fn record(
        &self,
        user_id: UserId,
        chat_id: ChatId,
        message_id: MessageId,
        provider: &str,
        model: &str,
        usage: Option<TokenUsage>,
    ) -> bool {
        let usage = usage.unwrap_or_default();
        let record = UsageRecord {
            user_id,
            chat_id,
            message_id,
            provider: provider.to_owned(),
            model: model.to_owned(),
            token_in: usage.input_tokens,
            token_out: usage.output_tokens,
            created_at: Utc::now(),
        };

        match self.store.append(&record).await {
            Ok(()) => {
                debug!(
                    user.id = %user_id,
                    chat.id = %chat_id,
                    message.id = %message_id,
                    tokens.input = usage.input_tokens,
                    tokens.output = usage.output_tokens,
                    "Usage recorded"
                );
                true
            }
            Err(e) => {
                warn!(
                    user.id = %user_id,
                    chat.id = %chat_id,
                    message.id = %message_id,
                    "Failed to record usage: {e}"
                );
                false
            }
        }
    }
}

impl std::fmt::Debug for UsageLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageLedger").finish_non_exhaustive()
    }
}

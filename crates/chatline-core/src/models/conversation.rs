// ABOUTME: Chat, message, and conversation-turn types for the message store
// ABOUTME: MessageRole tags every turn as system, user, or assistant
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ChatId, MessageId, UserId};
use super::usage::TokenUsage;
use crate::errors::AppError;

/// Role of a message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Fixed instructions for the model
    System,
    /// End user input
    User,
    /// Model output
    Assistant,
}

impl MessageRole {
    /// Wire and storage representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Self::System),
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(AppError::internal(format!("Unknown message role: {other}"))),
        }
    }
}

/// One immutable, role-tagged entry of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Author role
    pub role: MessageRole,
    /// Text content
    pub content: String,
}

impl ConversationTurn {
    /// Create a turn
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// System turn
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// User turn
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Assistant turn
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// A chat owned by a single user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRecord {
    /// Chat identifier
    pub id: ChatId,
    /// Owner
    pub user_id: UserId,
    /// Display title
    pub title: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last message time
    pub updated_at: DateTime<Utc>,
}

/// A persisted message row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Message identifier
    pub id: MessageId,
    /// Owning chat
    pub chat_id: ChatId,
    /// Author role
    pub role: MessageRole,
    /// Text content
    pub content: String,
    /// Provider that generated an assistant message
    pub provider: Option<String>,
    /// Model that generated an assistant message
    pub model: Option<String>,
    /// Prompt tokens billed for an assistant message
    pub token_in: Option<u32>,
    /// Completion tokens billed for an assistant message
    pub token_out: Option<u32>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Message to append to a chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    /// Author role
    pub role: MessageRole,
    /// Text content
    pub content: String,
    /// Generating provider, assistant messages only
    pub provider: Option<String>,
    /// Generating model, assistant messages only
    pub model: Option<String>,
    /// Final token counts, assistant messages only
    pub usage: Option<TokenUsage>,
}

impl NewMessage {
    /// Inbound user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            provider: None,
            model: None,
            usage: None,
        }
    }

    /// Completed assistant reply tagged with its provenance
    #[must_use]
    pub fn assistant(
        content: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
        usage: Option<TokenUsage>,
    ) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            provider: Some(provider.into()),
            model: Some(model.into()),
            usage,
        }
    }
}

impl From<&MessageRecord> for ConversationTurn {
    fn from(record: &MessageRecord) -> Self {
        Self::new(record.role, record.content.clone())
    }
}

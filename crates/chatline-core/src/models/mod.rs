// ABOUTME: Core data models shared by the orchestrator, stores, and HTTP surface
// ABOUTME: Re-exports identifiers, conversation turns, and message/usage records
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

//! # Data Models
//!
//! - `UserId`, `ChatId`, `MessageId`: type-safe identifiers
//! - `ConversationTurn`: role-tagged text entry fed to the prompt assembler
//! - `ChatRecord`, `MessageRecord`, `NewMessage`: message store rows
//! - `UsageRecord`, `TokenUsage`: usage accounting

mod conversation;
mod ids;
mod usage;

pub use conversation::{ChatRecord, ConversationTurn, MessageRecord, MessageRole, NewMessage};
pub use ids::{ChatId, MessageId, UserId};
pub use usage::{TokenUsage, UsageRecord};

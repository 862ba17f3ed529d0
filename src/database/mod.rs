// ABOUTME: Persistence collaborators for chats, messages, and usage accounting
// ABOUTME: Defines the store traits and the SQLite-backed implementation with migrations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

//! # Database Management
//!
//! The orchestrator talks to storage only through [`ChatStore`] and
//! [`UsageStore`]. [`SqliteStore`] implements both on a single `sqlx` pool;
//! tests substitute in-memory or fault-injecting implementations.

mod chat;
mod usage;

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chatline_core::models::{
    ChatId, ChatRecord, ConversationTurn, MessageId, NewMessage, UsageRecord, UserId,
};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::errors::{AppError, AppResult};

/// Pool size for file-backed databases
const MAX_CONNECTIONS: u32 = 5;

/// How long a query waits for a pooled connection
const ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Message store used by the orchestrator
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Fetch a chat only if `user_id` owns it
    ///
    /// # Errors
    ///
    /// Returns `CHAT_NOT_FOUND` when the chat is missing or owned by someone else
    async fn find_chat_owned_by(&self, user_id: UserId, chat_id: ChatId) -> AppResult<ChatRecord>;

    /// Append a message to a chat and return its id
    ///
    /// # Errors
    ///
    /// Returns a database error if the insert fails
    async fn append_message(&self, chat_id: ChatId, message: NewMessage) -> AppResult<MessageId>;

    /// All turns of a chat in creation order
    ///
    /// # Errors
    ///
    /// Returns a database error if the query fails
    async fn list_turns(&self, chat_id: ChatId) -> AppResult<Vec<ConversationTurn>>;
}

/// Append-only usage store
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Persist one usage row
    ///
    /// # Errors
    ///
    /// Returns a database error if the insert fails
    async fn append(&self, record: &UsageRecord) -> AppResult<()>;
}

/// SQLite implementation of both stores
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to `database_url`, creating the file if needed, and run migrations
    ///
    /// In-memory URLs use a single connection so every query sees the same
    /// database.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, the connection fails, or a
    /// migration fails
    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::config(format!("Invalid DATABASE_URL: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true);

        let max_connections = if database_url.contains(":memory:") {
            1
        } else {
            MAX_CONNECTIONS
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
            .connect_with(options)
            .await
            .map_err(|e| AppError::database(format!("Failed to connect to database: {e}")))?;

        let store = Self { pool };
        store.migrate().await?;
        info!("Database ready at {database_url}");
        Ok(store)
    }

    /// Wrap an existing pool without running migrations
    #[must_use]
    pub const fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create tables and indexes if they do not exist
    ///
    /// # Errors
    ///
    /// Returns a database error if any statement fails
    pub async fn migrate(&self) -> AppResult<()> {
        let statements = [
            r"
            CREATE TABLE IF NOT EXISTS chats (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
            "CREATE INDEX IF NOT EXISTS idx_chats_user ON chats(user_id, updated_at)",
            r"
            CREATE TABLE IF NOT EXISTS messages (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                chat_id TEXT NOT NULL REFERENCES chats(id) ON DELETE CASCADE,
                role TEXT NOT NULL CHECK (role IN ('system', 'user', 'assistant')),
                content TEXT NOT NULL,
                provider TEXT,
                model TEXT,
                token_in INTEGER,
                token_out INTEGER,
                created_at TEXT NOT NULL
            )
            ",
            "CREATE INDEX IF NOT EXISTS idx_messages_chat ON messages(chat_id, created_at, seq)",
            r"
            CREATE TABLE IF NOT EXISTS usage_logs (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                chat_id TEXT NOT NULL,
                message_id TEXT NOT NULL,
                provider TEXT NOT NULL,
                model TEXT NOT NULL,
                token_in INTEGER NOT NULL,
                token_out INTEGER NOT NULL,
                created_at TEXT NOT NULL
            )
            ",
            "CREATE INDEX IF NOT EXISTS idx_usage_user ON usage_logs(user_id, created_at)",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::database(format!("Migration failed: {e}")))?;
        }
        Ok(())
    }
}

/// Parse a stored identifier column
fn parse_id<T: FromStr>(value: &str, column: &str) -> AppResult<T>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| AppError::database(format!("Corrupt {column} value '{value}': {e}")))
}

/// Parse a stored RFC 3339 timestamp column
fn parse_timestamp(value: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::database(format!("Corrupt timestamp '{value}': {e}")))
}

/// Convert an optional stored token count
fn token_count(value: Option<i64>) -> Option<u32> {
    value.and_then(|v| u32::try_from(v).ok())
}

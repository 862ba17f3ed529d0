// ABOUTME: SQLite operations for chats and their ordered message history
// ABOUTME: Enforces ownership on lookup and keeps creation order stable via an insert sequence
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

use async_trait::async_trait;
use chatline_core::constants::database::DEFAULT_CHAT_TITLE;
use chatline_core::models::{
    ChatId, ChatRecord, ConversationTurn, MessageId, MessageRecord, MessageRole, NewMessage,
    UserId,
};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{parse_id, parse_timestamp, token_count, ChatStore, SqliteStore};
use crate::errors::{AppError, AppResult};

fn chat_from_row(row: &SqliteRow) -> AppResult<ChatRecord> {
    Ok(ChatRecord {
        id: parse_id(row.get("id"), "chats.id")?,
        user_id: parse_id(row.get("user_id"), "chats.user_id")?,
        title: row.get("title"),
        created_at: parse_timestamp(row.get("created_at"))?,
        updated_at: parse_timestamp(row.get("updated_at"))?,
    })
}

fn message_from_row(row: &SqliteRow) -> AppResult<MessageRecord> {
    let role: &str = row.get("role");
    Ok(MessageRecord {
        id: parse_id(row.get("id"), "messages.id")?,
        chat_id: parse_id(row.get("chat_id"), "messages.chat_id")?,
        role: role.parse::<MessageRole>()?,
        content: row.get("content"),
        provider: row.get("provider"),
        model: row.get("model"),
        token_in: token_count(row.get("token_in")),
        token_out: token_count(row.get("token_out")),
        created_at: parse_timestamp(row.get("created_at"))?,
    })
}

impl SqliteStore {
    /// Create a chat owned by `user_id`
    ///
    /// Blank or missing titles fall back to the default title.
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub async fn create_chat(&self, user_id: UserId, title: Option<&str>) -> AppResult<ChatRecord> {
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_CHAT_TITLE);
        let now = Utc::now();
        let chat = ChatRecord {
            id: ChatId::new(),
            user_id,
            title: title.to_owned(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r"
            INSERT INTO chats (id, user_id, title, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            ",
        )
        .bind(chat.id.to_string())
        .bind(user_id.to_string())
        .bind(&chat.title)
        .bind(now.to_rfc3339())
        .execute(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to create chat: {e}")))?;

        Ok(chat)
    }

    /// List the user's chats, most recently active first
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub async fn list_chats(&self, user_id: UserId) -> AppResult<Vec<ChatRecord>> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, title, created_at, updated_at
            FROM chats
            WHERE user_id = $1
            ORDER BY updated_at DESC
            ",
        )
        .bind(user_id.to_string())
        .fetch_all(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to list chats: {e}")))?;

        rows.iter().map(chat_from_row).collect()
    }

    /// Rename a chat the user owns
    ///
    /// # Errors
    ///
    /// Returns `CHAT_NOT_FOUND` if the user does not own the chat, or a
    /// database error if the update fails
    pub async fn rename_chat(
        &self,
        user_id: UserId,
        chat_id: ChatId,
        title: &str,
    ) -> AppResult<ChatRecord> {
        let result = sqlx::query(
            r"
            UPDATE chats SET title = $1, updated_at = $2
            WHERE id = $3 AND user_id = $4
            ",
        )
        .bind(title)
        .bind(Utc::now().to_rfc3339())
        .bind(chat_id.to_string())
        .bind(user_id.to_string())
        .execute(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to rename chat: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::chat_not_found(chat_id));
        }
        self.find_chat_owned_by(user_id, chat_id).await
    }

    /// Delete a chat the user owns together with its messages
    ///
    /// # Errors
    ///
    /// Returns `CHAT_NOT_FOUND` if the user does not own the chat, or a
    /// database error if the delete fails
    pub async fn delete_chat(&self, user_id: UserId, chat_id: ChatId) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM chats WHERE id = $1 AND user_id = $2")
            .bind(chat_id.to_string())
            .bind(user_id.to_string())
            .execute(self.pool())
            .await
            .map_err(|e| AppError::database(format!("Failed to delete chat: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::chat_not_found(chat_id));
        }
        Ok(())
    }

    /// Full message records for a chat in creation order
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub async fn list_messages(&self, chat_id: ChatId) -> AppResult<Vec<MessageRecord>> {
        let rows = sqlx::query(
            r"
            SELECT id, chat_id, role, content, provider, model, token_in, token_out, created_at
            FROM messages
            WHERE chat_id = $1
            ORDER BY created_at ASC, seq ASC
            ",
        )
        .bind(chat_id.to_string())
        .fetch_all(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to list messages: {e}")))?;

        rows.iter().map(message_from_row).collect()
    }
}

#[async_trait]
impl ChatStore for SqliteStore {
    async fn find_chat_owned_by(&self, user_id: UserId, chat_id: ChatId) -> AppResult<ChatRecord> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, title, created_at, updated_at
            FROM chats
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(chat_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to get chat: {e}")))?;

        row.as_ref()
            .map(chat_from_row)
            .transpose()?
            .ok_or_else(|| AppError::chat_not_found(chat_id))
    }

    async fn append_message(&self, chat_id: ChatId, message: NewMessage) -> AppResult<MessageId> {
        let id = MessageId::new();
        let now = Utc::now().to_rfc3339();
        let (token_in, token_out) = message.usage.map_or((None, None), |u| {
            (
                Some(i64::from(u.input_tokens)),
                Some(i64::from(u.output_tokens)),
            )
        });

        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;

        sqlx::query(
            r"
            INSERT INTO messages (id, chat_id, role, content, provider, model, token_in, token_out, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(id.to_string())
        .bind(chat_id.to_string())
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(message.provider.as_deref())
        .bind(message.model.as_deref())
        .bind(token_in)
        .bind(token_out)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to insert message: {e}")))?;

        sqlx::query("UPDATE chats SET updated_at = $1 WHERE id = $2")
            .bind(&now)
            .bind(chat_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to touch chat: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit message: {e}")))?;

        Ok(id)
    }

    async fn list_turns(&self, chat_id: ChatId) -> AppResult<Vec<ConversationTurn>> {
        Ok(self
            .list_messages(chat_id)
            .await?
            .iter()
            .map(ConversationTurn::from)
            .collect())
    }
}

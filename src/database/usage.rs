// ABOUTME: SQLite append-only storage for per-run token usage rows
// ABOUTME: Rows are written once and never updated
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

use async_trait::async_trait;
use chatline_core::models::{UsageRecord, UserId};
use sqlx::Row;

use super::{parse_id, parse_timestamp, SqliteStore, UsageStore};
use crate::errors::{AppError, AppResult};

impl SqliteStore {
    /// Usage rows recorded for a user, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if database operation fails
    pub async fn list_usage(&self, user_id: UserId) -> AppResult<Vec<UsageRecord>> {
        let rows = sqlx::query(
            r"
            SELECT user_id, chat_id, message_id, provider, model, token_in, token_out, created_at
            FROM usage_logs
            WHERE user_id = $1
            ORDER BY seq ASC
            ",
        )
        .bind(user_id.to_string())
        .fetch_all(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to list usage: {e}")))?;

        rows.iter()
            .map(|row| {
                Ok(UsageRecord {
                    user_id: parse_id(row.get("user_id"), "usage_logs.user_id")?,
                    chat_id: parse_id(row.get("chat_id"), "usage_logs.chat_id")?,
                    message_id: parse_id(row.get("message_id"), "usage_logs.message_id")?,
                    provider: row.get("provider"),
                    model: row.get("model"),
                    token_in: u32::try_from(row.get::<i64, _>("token_in")).unwrap_or(0),
                    token_out: u32::try_from(row.get::<i64, _>("token_out")).unwrap_or(0),
                    created_at: parse_timestamp(row.get("created_at"))?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl UsageStore for SqliteStore {
    async fn append(&self, record: &UsageRecord) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO usage_logs (user_id, chat_id, message_id, provider, model, token_in, token_out, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(record.user_id.to_string())
        .bind(record.chat_id.to_string())
        .bind(record.message_id.to_string())
        .bind(&record.provider)
        .bind(&record.model)
        .bind(i64::from(record.token_in))
        .bind(i64::from(record.token_out))
        .bind(record.created_at.to_rfc3339())
        .execute(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to record usage: {e}")))?;

        Ok(())
    }
}

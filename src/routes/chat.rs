// ABOUTME: Chat route handlers for conversation management and streamed replies
// ABOUTME: Exposes CRUD over chats and the SSE endpoint backed by the orchestrator
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

//! Chat routes
//!
//! Every handler requires the [`CallerId`] header. Chats owned by someone
//! else answer `CHAT_NOT_FOUND`.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chatline_core::constants::{limits, orchestration};
use chatline_core::models::{ChatId, ChatRecord, MessageRecord};
use chrono::{DateTime, Utc};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{parse_json, parse_json_or_default, CallerId, TraceId};
use crate::database::ChatStore;
use crate::errors::{AppError, AppResult};
use crate::orchestrator::{SendMessageRequest, StreamEvent};
use crate::server::ServerResources;

/// Custom-method suffix of the streaming endpoint
const STREAM_ACTION: &str = "messages:stream";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Body of `POST /api/chats`
#[derive(Debug, Default, Deserialize)]
pub struct CreateChatRequest {
    /// Optional title
    #[serde(default)]
    pub title: Option<String>,
}

/// Body of `PATCH /api/chats/:chat_id`
#[derive(Debug, Deserialize)]
pub struct RenameChatRequest {
    /// New title
    pub title: String,
}

/// Body of `POST /api/chats/:chat_id/messages:stream`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamMessageRequest {
    /// Message text
    pub content: String,
    /// Model override
    #[serde(default)]
    pub model: Option<String>,
    /// Temperature override
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Max tokens override
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

/// Chat summary
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    /// Chat ID
    pub id: ChatId,
    /// Title
    pub title: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last activity timestamp
    pub updated_at: DateTime<Utc>,
}

impl From<ChatRecord> for ChatResponse {
    fn from(chat: ChatRecord) -> Self {
        Self {
            id: chat.id,
            title: chat.title,
            created_at: chat.created_at,
            updated_at: chat.updated_at,
        }
    }
}

/// One stored message
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    /// Message ID
    pub id: String,
    /// `system`, `user` or `assistant`
    pub role: String,
    /// Text
    pub content: String,
    /// Provider that produced an assistant reply
    pub provider: Option<String>,
    /// Model that produced an assistant reply
    pub model: Option<String>,
    /// Prompt tokens
    pub token_in: Option<u32>,
    /// Completion tokens
    pub token_out: Option<u32>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl From<MessageRecord> for MessageResponse {
    fn from(message: MessageRecord) -> Self {
        Self {
            id: message.id.to_string(),
            role: message.role.as_str().to_owned(),
            content: message.content,
            provider: message.provider,
            model: message.model,
            token_in: message.token_in,
            token_out: message.token_out,
            created_at: message.created_at,
        }
    }
}

/// Chat with its full history
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatDetailResponse {
    /// Chat summary fields
    #[serde(flatten)]
    pub chat: ChatResponse,
    /// Messages in creation order
    pub messages: Vec<MessageResponse>,
}

// ============================================================================
// Routes
// ============================================================================

/// Chat routes implementation
pub struct ChatRoutes;

impl ChatRoutes {
    /// Create all chat routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/chats", post(Self::create_chat).get(Self::list_chats))
            .route(
                "/api/chats/:chat_id",
                get(Self::get_chat)
                    .patch(Self::rename_chat)
                    .delete(Self::delete_chat),
            )
            .route("/api/chats/:chat_id/:action", post(Self::chat_action))
            .with_state(resources)
    }

    /// Path segments that are not a UUID cannot name an existing chat
    fn parse_chat_id(raw: &str) -> AppResult<ChatId> {
        raw.parse().map_err(|_| AppError::chat_not_found(raw))
    }

    fn validate_title(title: &str) -> AppResult<()> {
        if title.chars().count() > limits::MAX_TITLE_CHARS {
            return Err(AppError::invalid_input(format!(
                "Title must be at most {} characters",
                limits::MAX_TITLE_CHARS
            )));
        }
        Ok(())
    }

    async fn create_chat(
        State(resources): State<Arc<ServerResources>>,
        CallerId(user_id): CallerId,
        body: Bytes,
    ) -> AppResult<Response> {
        let request: CreateChatRequest = parse_json_or_default(&body)?;
        if let Some(title) = &request.title {
            Self::validate_title(title)?;
        }

        let chat = resources
            .store
            .create_chat(user_id, request.title.as_deref())
            .await?;
        info!(user.id = %user_id, chat.id = %chat.id, "Chat created");

        Ok((StatusCode::CREATED, Json(ChatResponse::from(chat))).into_response())
    }

    async fn list_chats(
        State(resources): State<Arc<ServerResources>>,
        CallerId(user_id): CallerId,
    ) -> AppResult<Json<Vec<ChatResponse>>> {
        let chats = resources.store.list_chats(user_id).await?;
        Ok(Json(chats.into_iter().map(ChatResponse::from).collect()))
    }

    async fn get_chat(
        State(resources): State<Arc<ServerResources>>,
        CallerId(user_id): CallerId,
        Path(chat_id): Path<String>,
    ) -> AppResult<Json<ChatDetailResponse>> {
        let chat_id = Self::parse_chat_id(&chat_id)?;
        let chat = resources.store.find_chat_owned_by(user_id, chat_id).await?;
        let messages = resources.store.list_messages(chat_id).await?;

        Ok(Json(ChatDetailResponse {
            chat: chat.into(),
            messages: messages.into_iter().map(MessageResponse::from).collect(),
        }))
    }

    async fn rename_chat(
        State(resources): State<Arc<ServerResources>>,
        CallerId(user_id): CallerId,
        Path(chat_id): Path<String>,
        body: Bytes,
    ) -> AppResult<Json<ChatResponse>> {
        let chat_id = Self::parse_chat_id(&chat_id)?;
        let request: RenameChatRequest = parse_json(&body)?;
        let title = request.title.trim();
        if title.is_empty() {
            return Err(AppError::invalid_input("Title is required"));
        }
        Self::validate_title(title)?;

        let chat = resources
            .store
            .rename_chat(user_id, chat_id, title)
            .await?;
        Ok(Json(chat.into()))
    }

    async fn delete_chat(
        State(resources): State<Arc<ServerResources>>,
        CallerId(user_id): CallerId,
        Path(chat_id): Path<String>,
    ) -> AppResult<StatusCode> {
        let chat_id = Self::parse_chat_id(&chat_id)?;
        resources.store.delete_chat(user_id, chat_id).await?;
        info!(user.id = %user_id, chat.id = %chat_id, "Chat deleted");
        Ok(StatusCode::NO_CONTENT)
    }

    /// Dispatch `POST /api/chats/:chat_id/<action>` custom methods
    async fn chat_action(
        State(resources): State<Arc<ServerResources>>,
        caller: CallerId,
        trace: TraceId,
        Path((chat_id, action)): Path<(String, String)>,
        body: Bytes,
    ) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
        if action != STREAM_ACTION {
            return Err(AppError::not_found(format!("Chat action '{action}'")));
        }
        Self::stream_message(&resources, caller, trace, &chat_id, &body)
    }

    /// Start a run and relay its events as SSE
    ///
    /// Failures after the response starts, including validation and rate
    /// limiting inside the orchestrator, arrive as the stream's `error` event.
    fn stream_message(
        resources: &ServerResources,
        CallerId(user_id): CallerId,
        TraceId(trace_id): TraceId,
        chat_id: &str,
        body: &Bytes,
    ) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
        let chat_id = Self::parse_chat_id(chat_id)?;
        let request: StreamMessageRequest = parse_json(body)?;

        let events = resources.orchestrator.send_message(SendMessageRequest {
            user_id,
            chat_id,
            content: request.content,
            model: request.model,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            trace_id,
        });

        let stream = events.map(|event| Ok(Self::to_sse_event(&event)));
        Ok(Sse::new(stream).keep_alive(
            KeepAlive::new().interval(Duration::from_secs(orchestration::SSE_KEEP_ALIVE_SECS)),
        ))
    }

    fn to_sse_event(event: &StreamEvent) -> Event {
        Event::default()
            .event(event.event_name())
            .data(event.to_json())
    }
}

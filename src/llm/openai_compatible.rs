// ABOUTME: OpenAI-compatible chat completions provider used for OpenAI and Groq
// ABOUTME: Streams deltas over SSE with include_usage and maps failures to provider errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

//! # `OpenAI`-Compatible Provider
//!
//! Reference HTTP implementation of [`LlmProvider`]. Any endpoint speaking the
//! `OpenAI` chat completions API works; Groq is configured through the same
//! type with a different base URL and default model.
//!
//! Wire behavior:
//!
//! - `POST {base_url}/chat/completions` with bearer authentication
//! - streaming requests ask for `stream_options.include_usage` so the final
//!   chunk carries `prompt_tokens`/`completion_tokens`
//! - `top_p` is sent only when positive, `reasoning_effort` only when set
//! - `max_completion_tokens` replaces `max_tokens` when configured
//! - one network attempt per call

use std::time::Duration;

use async_trait::async_trait;
use chatline_core::constants::llm;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt;
use tracing::{debug, error, instrument};

use super::sse_parser::create_sse_stream;
use super::{ChatMessage, ChatRequest, ChatStream, LlmProvider, StreamDelta};
use crate::config::{LlmConfig, LlmProviderType};
use crate::errors::{AppError, AppResult};

// ============================================================================
// API Request/Response Types
// ============================================================================

/// Chat completions request body
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> From<&'a ChatMessage> for WireMessage<'a> {
    fn from(msg: &'a ChatMessage) -> Self {
        Self {
            role: msg.role.as_str(),
            content: &msg.content,
        }
    }
}

/// One `data:` payload of a streaming response
#[derive(Debug, Deserialize)]
struct StreamChunkPayload {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<WireDelta>,
}

#[derive(Debug, Deserialize)]
struct WireDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: Option<u32>,
    #[serde(default)]
    completion_tokens: Option<u32>,
}

/// Non-streaming response body
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Error response structure
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// Configuration for the `OpenAI`-compatible provider
#[derive(Clone)]
pub struct OpenAiCompatibleConfig {
    /// Provider name recorded on messages and usage rows
    pub provider_name: &'static str,
    /// Provider display name
    pub display_name: &'static str,
    /// Base URL for the API, without trailing slash
    pub base_url: String,
    /// Bearer token
    pub api_key: Option<String>,
    /// Model used when the request names none
    pub default_model: String,
    /// Temperature used when the request sets none
    pub default_temperature: f32,
    /// Nucleus sampling, sent only when positive
    pub top_p: f32,
    /// Token cap used when the request sets none
    pub default_max_tokens: u32,
    /// Replaces `max_tokens` on the wire when set
    pub max_completion_tokens: Option<u32>,
    /// Sent as `reasoning_effort` when set
    pub reasoning_effort: Option<String>,
    /// TCP connect timeout
    pub connect_timeout: Duration,
    /// Whole-request timeout for blocking calls, idle timeout between stream reads
    pub request_timeout: Duration,
}

impl OpenAiCompatibleConfig {
    /// Build provider settings from the server configuration
    #[must_use]
    pub fn from_llm_config(config: &LlmConfig) -> Self {
        let (provider_name, display_name) = match config.provider {
            LlmProviderType::Groq => ("groq", "Groq"),
            LlmProviderType::OpenAi | LlmProviderType::Mock => ("openai", "OpenAI"),
        };
        Self {
            provider_name,
            display_name,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
            default_model: config.model.clone(),
            default_temperature: config.temperature,
            top_p: config.top_p,
            default_max_tokens: config.max_tokens,
            max_completion_tokens: config.max_completion_tokens,
            reasoning_effort: config
                .reasoning_effort
                .clone()
                .filter(|effort| !effort.trim().is_empty()),
            connect_timeout: Duration::from_secs(llm::CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(llm::REQUEST_TIMEOUT_SECS),
        }
    }
}

// ============================================================================
// Provider Implementation
// ============================================================================

/// `OpenAI`-compatible LLM provider
pub struct OpenAiCompatibleProvider {
    client: Client,
    config: OpenAiCompatibleConfig,
}

impl OpenAiCompatibleProvider {
    /// Create a new provider with the given configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: OpenAiCompatibleConfig) -> AppResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Provider settings in use
    #[must_use]
    pub const fn config(&self) -> &OpenAiCompatibleConfig {
        &self.config
    }

    fn completions_url(&self) -> String {
        format!("{}{}", self.config.base_url, llm::CHAT_COMPLETIONS_PATH)
    }

    fn build_body<'a>(&'a self, request: &'a ChatRequest, stream: bool) -> CompletionRequest<'a> {
        let (max_tokens, max_completion_tokens) = self.config.max_completion_tokens.map_or_else(
            || {
                (
                    Some(request.max_tokens.unwrap_or(self.config.default_max_tokens)),
                    None,
                )
            },
            |cap| (None, Some(cap)),
        );

        CompletionRequest {
            model: request
                .model
                .as_deref()
                .unwrap_or(&self.config.default_model),
            messages: request.messages.iter().map(WireMessage::from).collect(),
            temperature: request
                .temperature
                .unwrap_or(self.config.default_temperature),
            max_tokens,
            max_completion_tokens,
            stream,
            stream_options: stream.then_some(StreamOptions {
                include_usage: true,
            }),
            top_p: (self.config.top_p > 0.0).then_some(self.config.top_p),
            reasoning_effort: self.config.reasoning_effort.as_deref(),
        }
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.config.api_key {
            Some(ref api_key) => builder.bearer_auth(api_key),
            None => builder,
        }
    }

    /// Send a request and reject non-success statuses
    async fn send(&self, builder: RequestBuilder) -> AppResult<reqwest::Response> {
        let provider = self.config.provider_name;
        let response = self.authorized(builder).send().await.map_err(|e| {
            error!("Failed to send request to {provider}: {e}");
            AppError::upstream(provider, "request failed").with_source(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(parse_error_response(provider, status, &body))
    }
}

/// Map a non-success provider response to an upstream error
fn parse_error_response(provider: &str, status: StatusCode, body: &str) -> AppError {
    let detail = serde_json::from_str::<ApiErrorResponse>(body).map_or_else(
        |_| body.chars().take(200).collect::<String>(),
        |parsed| parsed.error.message,
    );
    let message = match status.as_u16() {
        401 | 403 => format!("authentication failed ({status}): {detail}"),
        429 => format!("provider rate limit reached ({status}): {detail}"),
        _ => format!("HTTP {status}: {detail}"),
    };
    error!("{provider} returned error status {status}");
    AppError::upstream(provider, message)
}

/// Decode one streaming payload into an optional delta
///
/// Payloads with neither text nor usage (role announcements, empty finish
/// chunks) produce no delta.
pub(crate) fn parse_stream_payload(json_str: &str) -> AppResult<Option<StreamDelta>> {
    let payload: StreamChunkPayload = serde_json::from_str(json_str)
        .map_err(|e| AppError::stream_error(format!("Malformed stream payload: {e}")))?;

    let text = payload
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta)
        .and_then(|delta| delta.content)
        .filter(|content| !content.is_empty());
    let (input_tokens, output_tokens) = payload
        .usage
        .map_or((None, None), |u| (u.prompt_tokens, u.completion_tokens));

    let delta = StreamDelta {
        text,
        input_tokens,
        output_tokens,
    };
    Ok((!delta.is_empty()).then_some(delta))
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &'static str {
        self.config.provider_name
    }

    fn display_name(&self) -> &'static str {
        self.config.display_name
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    #[instrument(skip(self, request), fields(provider = self.config.provider_name, messages = request.messages.len()))]
    async fn stream_chat(&self, request: &ChatRequest) -> AppResult<ChatStream> {
        let body = self.build_body(request, true);
        debug!(model = body.model, "Opening streaming completion");

        let response = self
            .send(self.client.post(self.completions_url()).json(&body))
            .await?;

        let provider = self.config.provider_name;
        let idle = self.config.request_timeout;
        let bytes = response
            .bytes_stream()
            .timeout(idle)
            .map(move |item| match item {
                Ok(Ok(chunk)) => Ok(chunk),
                Ok(Err(e)) => Err(AppError::upstream(provider, "stream read failed").with_source(e)),
                Err(_) => Err(AppError::upstream(
                    provider,
                    format!("no data received for {}s", idle.as_secs()),
                )),
            });

        Ok(create_sse_stream(bytes, parse_stream_payload))
    }

    #[instrument(skip(self, request), fields(provider = self.config.provider_name, messages = request.messages.len()))]
    async fn chat(&self, request: &ChatRequest) -> AppResult<String> {
        let body = self.build_body(request, false);
        let provider = self.config.provider_name;

        let response = self
            .send(
                self.client
                    .post(self.completions_url())
                    .timeout(self.config.request_timeout)
                    .json(&body),
            )
            .await?;

        let parsed: CompletionResponse = response.json().await.map_err(|e| {
            AppError::stream_error(format!("{provider}: failed to parse response: {e}"))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AppError::upstream(provider, "response contained no message content"))
    }
}

// ABOUTME: Unified error taxonomy shared by the orchestrator, providers, and HTTP surface
// ABOUTME: Defines ErrorCode with stable machine codes and the AppError carrier type
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

//! # Unified Error Handling
//!
//! Every failure that can reach a client, whether as an HTTP error body or as
//! a terminal `error` stream event, is expressed as an [`AppError`] carrying an
//! [`ErrorCode`]. The serialized code is stable and machine-readable.

#[cfg(feature = "http-response")]
mod http;

use std::error::Error as StdError;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Standard error codes used throughout the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Request validation
    /// Payload failed validation
    ValidationFailed,
    /// Malformed request
    BadRequest,
    /// Route or resource does not exist
    NotFound,

    // Identity and ownership
    /// No authenticated identity was supplied
    AuthRequired,
    /// Chat does not exist or is not visible to the caller
    ChatNotFound,
    /// Chat exists but belongs to another user
    ChatAccessDenied,

    // Admission
    /// Per-user request window exhausted
    RateLimited,

    // Upstream model provider
    /// Run exceeded its allotted lifetime
    LlmTimeout,
    /// Provider returned a non-2xx status or the transport failed
    LlmProviderError,
    /// Provider stream carried a payload that could not be decoded
    LlmStreamError,

    // Capacity and internals
    /// Worker pool and backlog are saturated
    ServiceUnavailable,
    /// Unexpected failure
    InternalError,
    /// Storage operation failed
    DatabaseError,
    /// Configuration is missing or invalid
    ConfigError,
}

impl ErrorCode {
    /// Stable machine-readable code, identical to the serialized form
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::BadRequest => "BAD_REQUEST",
            Self::NotFound => "NOT_FOUND",
            Self::AuthRequired => "AUTH_REQUIRED",
            Self::ChatNotFound => "CHAT_NOT_FOUND",
            Self::ChatAccessDenied => "CHAT_ACCESS_DENIED",
            Self::RateLimited => "RATE_LIMITED",
            Self::LlmTimeout => "LLM_TIMEOUT",
            Self::LlmProviderError => "LLM_PROVIDER_ERROR",
            Self::LlmStreamError => "LLM_STREAM_ERROR",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::InternalError => "INTERNAL_ERROR",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
        }
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            // 400 Bad Request
            Self::ValidationFailed | Self::BadRequest => 400,

            // 401 Unauthorized
            Self::AuthRequired => 401,

            // 403 Forbidden
            Self::ChatAccessDenied => 403,

            // 404 Not Found
            Self::ChatNotFound | Self::NotFound => 404,

            // 429 Too Many Requests
            Self::RateLimited => 429,

            // 502 Bad Gateway
            Self::LlmProviderError | Self::LlmStreamError => 502,

            // 503 Service Unavailable
            Self::ServiceUnavailable => 503,

            // 504 Gateway Timeout
            Self::LlmTimeout => 504,

            // 500 Internal Server Error
            Self::InternalError | Self::DatabaseError | Self::ConfigError => 500,
        }
    }

    /// Get a user-friendly description of this error
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::ValidationFailed => "Validation failed",
            Self::BadRequest => "Bad request",
            Self::NotFound => "Resource not found",
            Self::AuthRequired => "Authentication is required to access this resource",
            Self::ChatNotFound => "Chat not found",
            Self::ChatAccessDenied => "Access to chat denied",
            Self::RateLimited => "Too many requests, please try again later",
            Self::LlmTimeout => "Model request timeout",
            Self::LlmProviderError => "LLM provider error",
            Self::LlmStreamError => "Stream processing error",
            Self::ServiceUnavailable => "The service is temporarily at capacity",
            Self::InternalError => "An internal server error occurred",
            Self::DatabaseError => "Database operation failed",
            Self::ConfigError => "Configuration error encountered",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for the application
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn StdError + Send + Sync>>,
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a new `AppError` with the given code and message
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Authentication required
    #[must_use]
    pub fn auth_required() -> Self {
        Self::new(ErrorCode::AuthRequired, "Authentication required")
    }

    /// Payload validation failure
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    /// Unknown route or resource
    #[must_use]
    pub fn not_found(resource: impl fmt::Display) -> Self {
        Self::new(ErrorCode::NotFound, format!("{resource} not found"))
    }

    /// Chat missing, or not visible to the requesting user
    #[must_use]
    pub fn chat_not_found(chat_id: impl fmt::Display) -> Self {
        Self::new(ErrorCode::ChatNotFound, format!("Chat {chat_id} not found"))
    }

    /// Admission rejected for the current window
    #[must_use]
    pub fn rate_limited(limit: u32, window_secs: u64) -> Self {
        Self::new(
            ErrorCode::RateLimited,
            format!("Rate limit of {limit} requests per {window_secs}s exceeded"),
        )
    }

    /// Upstream provider failure (status, transport)
    #[must_use]
    pub fn upstream(provider: impl fmt::Display, message: impl fmt::Display) -> Self {
        Self::new(ErrorCode::LlmProviderError, format!("{provider}: {message}"))
    }

    /// Upstream payload could not be decoded
    #[must_use]
    pub fn stream_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::LlmStreamError, message)
    }

    /// Run lifetime exceeded
    #[must_use]
    pub fn timeout(after_secs: u64) -> Self {
        Self::new(
            ErrorCode::LlmTimeout,
            format!("Model request timed out after {after_secs}s"),
        )
    }

    /// Capacity exhausted
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Internal server error
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Database error
    #[must_use]
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

/// HTTP error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error payload
    pub error: ErrorResponseDetails,
}

/// Body of an [`ErrorResponse`]
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponseDetails {
    /// Machine-readable code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        Self {
            error: ErrorResponseDetails {
                code: error.code,
                message: error.message,
            },
        }
    }
}

#[cfg(feature = "database-errors")]
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        Self::database(error.to_string()).with_source(error)
    }
}

#[cfg(feature = "provider-errors")]
impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        let message = if error.is_timeout() {
            "request timed out".to_owned()
        } else if error.is_connect() {
            "connection failed".to_owned()
        } else {
            error.to_string()
        };
        Self::new(ErrorCode::LlmProviderError, message).with_source(error)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::internal(format!("Serialization failed: {error}")).with_source(error)
    }
}

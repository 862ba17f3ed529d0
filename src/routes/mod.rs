// ABOUTME: Route module organization for the chat server HTTP endpoints
// ABOUTME: Hosts the caller identity extractor shared by all authenticated routes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

//! HTTP routes
//!
//! Authentication happens upstream: a gateway verifies the client and
//! forwards the caller's id in the `x-user-id` header. Handlers here only
//! parse it.

/// Chat management and streaming routes
pub mod chat;
/// Health check routes
pub mod health;

pub use chat::ChatRoutes;
pub use health::HealthRoutes;

use axum::async_trait;
use axum::body::Bytes;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chatline_core::constants::headers;
use chatline_core::errors::ErrorCode;
use chatline_core::models::UserId;
use serde::de::DeserializeOwned;

use crate::errors::{AppError, AppResult};

/// Identity of the calling user taken from the gateway header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerId(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for CallerId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(headers::USER_ID)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<UserId>().ok())
            .map(Self)
            .ok_or_else(AppError::auth_required)
    }
}

/// Correlation id set by the request-id layer, absent outside the router
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceId(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for TraceId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .headers
                .get(headers::TRACE_ID)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned),
        ))
    }
}

/// Decode a JSON body; an empty body decodes as `T::default()`
pub(crate) fn parse_json_or_default<T>(body: &Bytes) -> AppResult<T>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    parse_json(body)
}

/// Decode a required JSON body
pub(crate) fn parse_json<T: DeserializeOwned>(body: &Bytes) -> AppResult<T> {
    serde_json::from_slice(body)
        .map_err(|e| AppError::new(ErrorCode::BadRequest, format!("Invalid JSON body: {e}")))
}

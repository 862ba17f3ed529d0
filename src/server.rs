// ABOUTME: Server assembly wiring configuration, storage, provider, and orchestrator into axum
// ABOUTME: Builds the router with request tracing and serves it until shutdown
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

//! # Server
//!
//! [`ServerResources`] holds the long-lived collaborators shared by every
//! request. [`build_router`] mounts the routes; [`serve`] binds the port and
//! runs until the shutdown future resolves.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderName, Request};
use axum::Router;
use chatline_core::constants::headers;
use tokio::net::TcpListener;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, Span};

use crate::config::ServerConfig;
use crate::database::{ChatStore, SqliteStore, UsageStore};
use crate::errors::{AppError, AppResult};
use crate::llm::{ChatProvider, LlmProvider};
use crate::orchestrator::{ChatOrchestrator, OrchestratorSettings};
use crate::routes::{ChatRoutes, HealthRoutes};

/// Shared state handed to route handlers
#[derive(Debug, Clone)]
pub struct ServerResources {
    /// Chat, message, and usage storage
    pub store: Arc<SqliteStore>,
    /// Run orchestrator
    pub orchestrator: ChatOrchestrator,
}

impl ServerResources {
    /// Wire resources from explicit collaborators
    #[must_use]
    pub fn new(
        store: Arc<SqliteStore>,
        provider: Arc<dyn LlmProvider>,
        settings: OrchestratorSettings,
    ) -> Self {
        let chats: Arc<dyn ChatStore> = store.clone();
        let usage: Arc<dyn UsageStore> = store.clone();
        let orchestrator = ChatOrchestrator::new(provider, chats, usage, settings);
        Self {
            store,
            orchestrator,
        }
    }

    /// Connect storage and select the provider from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the provider
    /// cannot be created
    pub async fn from_config(config: &ServerConfig) -> AppResult<Self> {
        let store = Arc::new(SqliteStore::connect(&config.database_url).await?);
        let provider: Arc<dyn LlmProvider> = Arc::new(ChatProvider::from_config(&config.llm)?);
        Ok(Self::new(
            store,
            provider,
            OrchestratorSettings::from_config(config),
        ))
    }
}

/// Build the application router
///
/// Requests without an `x-trace-id` header get a generated one. The id is
/// recorded on the request span and echoed on the response.
pub fn build_router(resources: Arc<ServerResources>) -> Router {
    let trace_header = HeaderName::from_static(headers::TRACE_ID);
    Router::new()
        .merge(HealthRoutes::routes(Arc::clone(&resources)))
        .merge(ChatRoutes::routes(resources))
        .layer(PropagateRequestIdLayer::new(trace_header.clone()))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(SetRequestIdLayer::new(trace_header, MakeRequestUuid))
}

fn request_span(request: &Request<Body>) -> Span {
    let trace_id = request
        .headers()
        .get(headers::TRACE_ID)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    info_span!(
        "http_request",
        method = %request.method(),
        path = %request.uri().path(),
        trace.id = %trace_id,
    )
}

/// Serve on `port` until `shutdown` resolves
///
/// # Errors
///
/// Returns an error if the port cannot be bound or the server fails
pub async fn serve<F>(resources: ServerResources, port: u16, shutdown: F) -> AppResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;
    info!("HTTP server listening on {addr}");

    axum::serve(listener, build_router(Arc::new(resources)))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| AppError::internal(format!("HTTP server error: {e}")))?;

    info!("HTTP server stopped");
    Ok(())
}

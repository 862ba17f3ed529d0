// ABOUTME: Health check route handlers for service monitoring
// ABOUTME: Reports service status with worker pool occupancy and a plain-text ping
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::server::ServerResources;

/// Health routes implementation
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create all health check routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        async fn health_handler(State(resources): State<Arc<ServerResources>>) -> Json<Value> {
            let executor = resources.orchestrator.executor();
            Json(json!({
                "status": "UP",
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "provider": resources.orchestrator.provider().name(),
                "workers": {
                    "size": executor.worker_count(),
                    "capacity": executor.capacity(),
                    "active": executor.active(),
                    "inFlight": executor.in_flight(),
                }
            }))
        }

        async fn ping_handler() -> &'static str {
            "pong"
        }

        Router::new()
            .route("/api/health", get(health_handler))
            .route("/api/health/ping", get(ping_handler))
            .with_state(resources)
    }
}

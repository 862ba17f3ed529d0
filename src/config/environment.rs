// ABOUTME: Environment-based configuration loaded once at server startup
// ABOUTME: Parses provider, admission, worker pool, and timeout settings with validation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

//! Environment-based configuration management
//!
//! All settings are read from environment variables (optionally seeded from a
//! `.env` file) when the server starts. Nothing here is consulted on the hot
//! path; the orchestrator receives immutable copies.

use std::env;
use std::fmt;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chatline_core::constants::{database, llm, orchestration, ports, rate_limit};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::types::LlmProviderType;

/// Top-level server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP API port
    pub http_port: u16,
    /// `SQLite` database URL
    pub database_url: String,
    /// Upstream provider settings
    pub llm: LlmConfig,
    /// Admission control
    pub rate_limit: RateLimitConfig,
    /// Worker pool and run lifetime
    pub orchestration: OrchestrationConfig,
}

/// Upstream LLM provider settings
#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Selected provider
    pub provider: LlmProviderType,
    /// Bearer token for HTTP providers
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// API base URL, without trailing slash
    pub base_url: String,
    /// Default model
    pub model: String,
    /// Default sampling temperature
    pub temperature: f32,
    /// Nucleus sampling, sent only when positive
    pub top_p: f32,
    /// Default completion token cap
    pub max_tokens: u32,
    /// Sent as `max_completion_tokens` instead of `max_tokens` when set
    pub max_completion_tokens: Option<u32>,
    /// Sent as `reasoning_effort` when set
    pub reasoning_effort: Option<String>,
}

/// Per-user fixed window admission settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    pub enabled: bool,
    /// Requests per window
    pub max_requests: u32,
    /// Window duration in seconds
    pub window_secs: u64,
}

/// Worker pool sizing and run timeout
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrchestrationConfig {
    /// Runs executing concurrently
    pub worker_pool_size: usize,
    /// Runs allowed to wait for a free worker
    pub queue_depth: usize,
    /// Hard limit on total run time in seconds
    pub run_timeout_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: rate_limit::DEFAULT_ENABLED,
            max_requests: rate_limit::DEFAULT_MAX_REQUESTS,
            window_secs: rate_limit::DEFAULT_WINDOW_SECS,
        }
    }
}

impl RateLimitConfig {
    /// Load admission settings from the environment
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            enabled: env_var_or("RATE_LIMIT_ENABLED", &rate_limit::DEFAULT_ENABLED.to_string())
                .parse()
                .context("Invalid RATE_LIMIT_ENABLED value")?,
            max_requests: env_var_or(
                "RATE_LIMIT_MAX_REQUESTS",
                &rate_limit::DEFAULT_MAX_REQUESTS.to_string(),
            )
            .parse()
            .context("Invalid RATE_LIMIT_MAX_REQUESTS value")?,
            window_secs: env_var_or(
                "RATE_LIMIT_WINDOW_SECS",
                &rate_limit::DEFAULT_WINDOW_SECS.to_string(),
            )
            .parse()
            .context("Invalid RATE_LIMIT_WINDOW_SECS value")?,
        })
    }

    /// Window length
    #[must_use]
    pub const fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: orchestration::DEFAULT_WORKER_POOL_SIZE,
            queue_depth: orchestration::DEFAULT_QUEUE_DEPTH,
            run_timeout_secs: orchestration::DEFAULT_RUN_TIMEOUT_SECS,
        }
    }
}

impl OrchestrationConfig {
    /// Load pool and timeout settings from the environment
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            worker_pool_size: env_var_or(
                "WORKER_POOL_SIZE",
                &orchestration::DEFAULT_WORKER_POOL_SIZE.to_string(),
            )
            .parse()
            .context("Invalid WORKER_POOL_SIZE value")?,
            queue_depth: env_var_or(
                "WORKER_QUEUE_DEPTH",
                &orchestration::DEFAULT_QUEUE_DEPTH.to_string(),
            )
            .parse()
            .context("Invalid WORKER_QUEUE_DEPTH value")?,
            run_timeout_secs: env_var_or(
                "RUN_TIMEOUT_SECS",
                &orchestration::DEFAULT_RUN_TIMEOUT_SECS.to_string(),
            )
            .parse()
            .context("Invalid RUN_TIMEOUT_SECS value")?,
        })
    }

    /// Hard run timeout
    #[must_use]
    pub const fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}

impl LlmConfig {
    /// Defaults for a provider, without an API key
    #[must_use]
    pub fn for_provider(provider: LlmProviderType) -> Self {
        Self {
            provider,
            api_key: None,
            base_url: provider.default_base_url().to_owned(),
            model: provider.default_model().to_owned(),
            temperature: llm::DEFAULT_TEMPERATURE,
            top_p: llm::DEFAULT_TOP_P,
            max_tokens: llm::DEFAULT_MAX_TOKENS,
            max_completion_tokens: None,
            reasoning_effort: None,
        }
    }

    /// Load provider settings from the environment
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable is set but cannot be parsed
    pub fn from_env() -> Result<Self> {
        let provider = LlmProviderType::from_str_or_default(&env_var_or(
            LlmProviderType::ENV_VAR,
            llm::DEFAULT_PROVIDER,
        ));

        Ok(Self {
            provider,
            api_key: env_opt("LLM_API_KEY"),
            base_url: env_opt("LLM_BASE_URL")
                .unwrap_or_else(|| provider.default_base_url().to_owned())
                .trim_end_matches('/')
                .to_owned(),
            model: env_opt("LLM_MODEL").unwrap_or_else(|| provider.default_model().to_owned()),
            temperature: env_var_or("LLM_TEMPERATURE", &llm::DEFAULT_TEMPERATURE.to_string())
                .parse()
                .context("Invalid LLM_TEMPERATURE value")?,
            top_p: env_var_or("LLM_TOP_P", &llm::DEFAULT_TOP_P.to_string())
                .parse()
                .context("Invalid LLM_TOP_P value")?,
            max_tokens: env_var_or("LLM_MAX_TOKENS", &llm::DEFAULT_MAX_TOKENS.to_string())
                .parse()
                .context("Invalid LLM_MAX_TOKENS value")?,
            max_completion_tokens: env_opt("LLM_MAX_COMPLETION_TOKENS")
                .map(|v| v.parse::<u32>())
                .transpose()
                .context("Invalid LLM_MAX_COMPLETION_TOKENS value")?,
            reasoning_effort: env_opt("LLM_REASONING_EFFORT"),
        })
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("max_tokens", &self.max_tokens)
            .field("max_completion_tokens", &self.max_completion_tokens)
            .field("reasoning_effort", &self.reasoning_effort)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or validation fails
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        if let Err(e) = dotenvy::dotenv() {
            warn!("No .env file found or failed to load: {e}");
        }

        let config = Self {
            http_port: env_var_or("HTTP_PORT", &ports::DEFAULT_HTTP_PORT.to_string())
                .parse()
                .context("Invalid HTTP_PORT value")?,
            database_url: env_var_or("DATABASE_URL", database::DEFAULT_DATABASE_URL),
            llm: LlmConfig::from_env()?,
            rate_limit: RateLimitConfig::from_env()?,
            orchestration: OrchestrationConfig::from_env()?,
        };

        config.validate()?;
        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value
    pub fn validate(&self) -> Result<()> {
        if self.llm.provider.requires_api_key() && self.llm.api_key.is_none() {
            bail!("LLM_API_KEY is required for provider '{}'", self.llm.provider);
        }
        if !(0.0..=llm::MAX_TEMPERATURE).contains(&self.llm.temperature) {
            bail!("LLM_TEMPERATURE must be between 0 and {}", llm::MAX_TEMPERATURE);
        }
        if !(0.0..=1.0).contains(&self.llm.top_p) {
            bail!("LLM_TOP_P must be between 0 and 1");
        }
        if self.llm.max_tokens == 0 {
            bail!("LLM_MAX_TOKENS must be at least 1");
        }
        if self.rate_limit.enabled && self.rate_limit.window_secs == 0 {
            bail!("RATE_LIMIT_WINDOW_SECS must be at least 1");
        }
        if self.orchestration.worker_pool_size == 0 {
            bail!("WORKER_POOL_SIZE must be at least 1");
        }
        if self.orchestration.run_timeout_secs == 0 {
            bail!("RUN_TIMEOUT_SECS must be at least 1");
        }
        Ok(())
    }

    /// Get a summary of the configuration for logging (without secrets)
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Chatline Server Configuration:\n\
             - HTTP Port: {}\n\
             - Database: {}\n\
             - LLM Provider: {} ({})\n\
             - Default Model: {}\n\
             - Rate Limiting: {}\n\
             - Worker Pool: {} workers, {} queued\n\
             - Run Timeout: {}s",
            self.http_port,
            self.database_url,
            self.llm.provider,
            self.llm.base_url,
            self.llm.model,
            if self.rate_limit.enabled {
                format!(
                    "{} requests / {}s",
                    self.rate_limit.max_requests, self.rate_limit.window_secs
                )
            } else {
                "Disabled".to_owned()
            },
            self.orchestration.worker_pool_size,
            self.orchestration.queue_depth,
            self.orchestration.run_timeout_secs,
        )
    }
}

/// Get environment variable or default value
fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Get a non-blank environment variable
fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

// ABOUTME: Unified LLM provider selector built once from startup configuration
// ABOUTME: Dispatches to the OpenAI-compatible client (OpenAI, Groq) or the offline mock
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

//! # LLM Provider Selector
//!
//! `LLM_PROVIDER` picks the variant when the server starts:
//! - `openai` (default): `OpenAI` chat completions
//! - `groq`: Groq's `OpenAI`-compatible endpoint
//! - `mock`: offline canned reply, no API key needed

use std::fmt;

use async_trait::async_trait;
use tracing::info;

use super::{
    ChatRequest, ChatStream, LlmProvider, MockProvider, OpenAiCompatibleConfig,
    OpenAiCompatibleProvider,
};
use crate::config::{LlmConfig, LlmProviderType};
use crate::errors::{AppError, AppResult};

/// Unified chat provider wrapping the configured variant
pub enum ChatProvider {
    /// `OpenAI` API
    OpenAi(OpenAiCompatibleProvider),
    /// Groq API
    Groq(OpenAiCompatibleProvider),
    /// Offline mock
    Mock(MockProvider),
}

impl ChatProvider {
    /// Create the provider named by the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP provider has no API key or its client
    /// cannot be created.
    pub fn from_config(config: &LlmConfig) -> AppResult<Self> {
        info!(
            "Initializing LLM provider: {} (set {} to change)",
            config.provider,
            LlmProviderType::ENV_VAR
        );

        if config.provider.requires_api_key() && config.api_key.is_none() {
            return Err(AppError::config(format!(
                "LLM_API_KEY is required for provider '{}'",
                config.provider
            )));
        }

        let provider = match config.provider {
            LlmProviderType::OpenAi => Self::OpenAi(OpenAiCompatibleProvider::new(
                OpenAiCompatibleConfig::from_llm_config(config),
            )?),
            LlmProviderType::Groq => Self::Groq(OpenAiCompatibleProvider::new(
                OpenAiCompatibleConfig::from_llm_config(config),
            )?),
            LlmProviderType::Mock => Self::Mock(MockProvider::new(config.model.clone())),
        };

        info!(
            "Provider {} initialized with model: {}",
            provider.display_name(),
            provider.default_model()
        );
        Ok(provider)
    }

    /// Get the provider type
    #[must_use]
    pub const fn provider_type(&self) -> LlmProviderType {
        match self {
            Self::OpenAi(_) => LlmProviderType::OpenAi,
            Self::Groq(_) => LlmProviderType::Groq,
            Self::Mock(_) => LlmProviderType::Mock,
        }
    }

    fn inner(&self) -> &dyn LlmProvider {
        match self {
            Self::OpenAi(p) | Self::Groq(p) => p,
            Self::Mock(p) => p,
        }
    }
}

#[async_trait]
impl LlmProvider for ChatProvider {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn display_name(&self) -> &'static str {
        self.inner().display_name()
    }

    fn default_model(&self) -> &str {
        self.inner().default_model()
    }

    async fn stream_chat(&self, request: &ChatRequest) -> AppResult<ChatStream> {
        self.inner().stream_chat(request).await
    }

    async fn chat(&self, request: &ChatRequest) -> AppResult<String> {
        self.inner().chat(request).await
    }
}

impl fmt::Debug for ChatProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatProvider")
            .field("provider", &self.name())
            .field("model", &self.default_model())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_needs_no_key() {
        let provider =
            ChatProvider::from_config(&LlmConfig::for_provider(LlmProviderType::Mock)).unwrap();
        assert_eq!(provider.provider_type(), LlmProviderType::Mock);
        assert_eq!(provider.name(), "mock");
    }

    #[test]
    fn test_groq_without_key_is_config_error() {
        let error =
            ChatProvider::from_config(&LlmConfig::for_provider(LlmProviderType::Groq)).unwrap_err();
        assert!(error.message.contains("LLM_API_KEY"));
    }

    #[test]
    fn test_groq_reports_its_name() {
        let mut config = LlmConfig::for_provider(LlmProviderType::Groq);
        config.api_key = Some("gsk_test".to_owned());
        let provider = ChatProvider::from_config(&config).unwrap();
        assert_eq!(provider.name(), "groq");
        assert_eq!(provider.default_model(), "llama-3.1-8b-instant");
    }
}

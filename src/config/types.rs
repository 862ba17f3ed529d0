// ABOUTME: Configuration type definitions for provider selection
// ABOUTME: LlmProviderType maps the LLM_PROVIDER setting to a provider variant and its defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Chatline Contributors

use std::fmt::{Display, Formatter, Result as FmtResult};

use chatline_core::constants::llm;
use serde::{Deserialize, Serialize};

/// Upstream LLM provider selection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderType {
    /// `OpenAI` chat completions API (default)
    #[default]
    OpenAi,
    /// Groq `OpenAI`-compatible API
    Groq,
    /// Offline provider echoing a canned reply, for local development
    Mock,
}

impl LlmProviderType {
    /// Environment variable name for LLM provider selection
    pub const ENV_VAR: &'static str = "LLM_PROVIDER";

    /// Parse from string with fallback to default
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "groq" => Self::Groq,
            "mock" | "echo" => Self::Mock,
            _ => Self::OpenAi,
        }
    }

    /// Name reported on persisted messages and usage records
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Groq => "groq",
            Self::Mock => "mock",
        }
    }

    /// API base URL used when `LLM_BASE_URL` is unset
    #[must_use]
    pub const fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAi | Self::Mock => llm::OPENAI_BASE_URL,
            Self::Groq => llm::GROQ_BASE_URL,
        }
    }

    /// Model used when `LLM_MODEL` is unset
    #[must_use]
    pub const fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => llm::OPENAI_DEFAULT_MODEL,
            Self::Groq => llm::GROQ_DEFAULT_MODEL,
            Self::Mock => llm::MOCK_DEFAULT_MODEL,
        }
    }

    /// Whether the variant talks to a remote API and needs a key
    #[must_use]
    pub const fn requires_api_key(&self) -> bool {
        !matches!(self, Self::Mock)
    }
}

impl Display for LlmProviderType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parsing_falls_back_to_openai() {
        assert_eq!(LlmProviderType::from_str_or_default("GROQ"), LlmProviderType::Groq);
        assert_eq!(LlmProviderType::from_str_or_default("mock"), LlmProviderType::Mock);
        assert_eq!(LlmProviderType::from_str_or_default("unknown"), LlmProviderType::OpenAi);
    }

    #[test]
    fn test_defaults_follow_provider() {
        assert_eq!(LlmProviderType::Groq.default_model(), "llama-3.1-8b-instant");
        assert_eq!(LlmProviderType::OpenAi.default_base_url(), "https://api.openai.com/v1");
        assert!(!LlmProviderType::Mock.requires_api_key());
    }
}

//! LLM provider abstraction.
//!
//! The content pipeline only needs "send one prompt, get text back", so the
//! trait is a single-turn chat call. [`GeminiProvider`] is the production
//! implementation.

pub mod gemini;

pub use gemini::GeminiProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{BibleError, Result};

// ============================================================================
// Messages
// ============================================================================

/// A single user turn sent to the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub content: String,
}

impl Message {
    pub fn user(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }
}

// ============================================================================
// Options & responses
// ============================================================================

/// Per-call generation options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Ask the provider to bias output towards a single JSON document.
    pub json_mode: bool,
}

impl ChatOptions {
    pub fn json() -> Self {
        Self {
            json_mode: true,
            ..Self::default()
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// Text returned by a provider call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LLMResponse {
    pub content: String,
    pub usage: Option<Usage>,
}

impl LLMResponse {
    pub fn text(content: &str) -> Self {
        Self {
            content: content.to_string(),
            usage: None,
        }
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }
}

// ============================================================================
// Provider trait
// ============================================================================

/// Opaque text-completion service.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Run one chat call. `model` overrides [`LLMProvider::default_model`].
    async fn chat(
        &self,
        messages: Vec<Message>,
        model: Option<&str>,
        options: ChatOptions,
    ) -> Result<LLMResponse>;

    fn default_model(&self) -> &str;

    fn name(&self) -> &str;
}

// ============================================================================
// Error classification
// ============================================================================

/// Coarse category of a failed provider HTTP call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// 401/403: bad or missing credentials.
    Auth,
    /// 429: quota or rate limit.
    RateLimited,
    /// 400/404/422: the request itself was rejected.
    InvalidRequest,
    /// 5xx and anything unrecognized.
    Server,
}

/// A classified provider failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub status: u16,
    pub message: String,
}

impl From<ProviderError> for BibleError {
    fn from(err: ProviderError) -> Self {
        let label = match err.kind {
            ProviderErrorKind::Auth => "authentication failed",
            ProviderErrorKind::RateLimited => "rate limited",
            ProviderErrorKind::InvalidRequest => "request rejected",
            ProviderErrorKind::Server => "upstream error",
        };
        BibleError::Provider(format!("{} (HTTP {}): {}", label, err.status, err.message))
    }
}

/// Classify a non-2xx provider response.
pub fn parse_provider_error(status: u16, message: &str) -> ProviderError {
    let kind = match status {
        401 | 403 => ProviderErrorKind::Auth,
        429 => ProviderErrorKind::RateLimited,
        400 | 404 | 422 => ProviderErrorKind::InvalidRequest,
        _ => ProviderErrorKind::Server,
    };
    ProviderError {
        kind,
        status,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider_error_kinds() {
        assert_eq!(parse_provider_error(401, "x").kind, ProviderErrorKind::Auth);
        assert_eq!(parse_provider_error(403, "x").kind, ProviderErrorKind::Auth);
        assert_eq!(
            parse_provider_error(429, "x").kind,
            ProviderErrorKind::RateLimited
        );
        assert_eq!(
            parse_provider_error(400, "x").kind,
            ProviderErrorKind::InvalidRequest
        );
        assert_eq!(parse_provider_error(503, "x").kind, ProviderErrorKind::Server);
        assert_eq!(parse_provider_error(302, "x").kind, ProviderErrorKind::Server);
    }

    #[test]
    fn test_provider_error_converts_to_bible_error() {
        let err: BibleError = parse_provider_error(429, "quota exhausted").into();
        let msg = err.to_string();
        assert!(matches!(err, BibleError::Provider(_)));
        assert!(msg.contains("rate limited"));
        assert!(msg.contains("429"));
        assert!(msg.contains("quota exhausted"));
    }

    #[test]
    fn test_usage_total() {
        let usage = Usage::new(10, 5);
        assert_eq!(usage.total_tokens, 15);
    }

    #[test]
    fn test_chat_options_json_builder() {
        let opts = ChatOptions::json().with_max_tokens(512).with_temperature(0.2);
        assert!(opts.json_mode);
        assert_eq!(opts.max_tokens, Some(512));
        assert_eq!(opts.temperature, Some(0.2));
    }
}

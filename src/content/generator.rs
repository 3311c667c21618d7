//! Cache-first content generation.
//!
//! `generate` looks the (verse, tier) pair up in the store, and on a miss
//! prompts the provider, normalizes whatever text comes back and writes the
//! result through. Provider failures and blank replies turn into placeholder
//! content that is returned but never stored. Only input validation is reported as an error.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::ContentStore;
use crate::error::{BibleError, Result};
use crate::health::UsageMetrics;
use crate::providers::{ChatOptions, LLMProvider, Message};

use super::{build_prompt, normalize, AgeGroup, CacheKey, GeneratedContent};

/// Advisory message attached to fallback content.
pub const GENERATION_FAILED: &str = "Failed to generate content";

/// Message for a request with an empty verse or tier.
pub const MISSING_FIELDS: &str = "Verse and ageGroup are required";

/// Outcome of a single `generate` call.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub content: GeneratedContent,
    /// True when served from the store without calling the provider.
    pub cached: bool,
    /// Set only when `content` is the fixed fallback.
    pub error: Option<String>,
}

impl Generation {
    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}

/// The content pipeline. Cheap to clone; all parts are shared.
#[derive(Clone)]
pub struct ContentGenerator {
    store: Arc<dyn ContentStore>,
    provider: Arc<dyn LLMProvider>,
    metrics: Arc<UsageMetrics>,
    options: ChatOptions,
}

impl ContentGenerator {
    pub fn new(
        store: Arc<dyn ContentStore>,
        provider: Arc<dyn LLMProvider>,
        metrics: Arc<UsageMetrics>,
    ) -> Self {
        Self {
            store,
            provider,
            metrics,
            options: ChatOptions::json(),
        }
    }

    /// Override the per-call options. JSON mode is always kept on.
    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = ChatOptions {
            json_mode: true,
            ..options
        };
        self
    }

    /// Produce content for `verse` at `age_group`, from cache when possible.
    pub async fn generate(&self, verse: &str, age_group: &str) -> Result<Generation> {
        validate(verse, age_group)?;
        self.metrics.record_request();

        let tier = AgeGroup::resolve(age_group);
        let key = CacheKey::new(verse, tier);

        if let Some(content) = self.cached(&key).await {
            self.metrics.record_cache_hit();
            debug!(cache_key = %key, "Content cache hit");
            return Ok(Generation {
                content,
                cached: true,
                error: None,
            });
        }
        self.metrics.record_cache_miss();
        info!(cache_key = %key, verse = verse.trim(), age_group = %tier, "Generating content");

        let prompt = build_prompt(verse, age_group);
        let reply = self
            .provider
            .chat(vec![Message::user(&prompt)], None, self.options.clone())
            .await
            .and_then(|response| {
                if response.content.trim().is_empty() {
                    Err(BibleError::Provider("empty model output".into()))
                } else {
                    Ok(response)
                }
            });
        let response = match reply {
            Ok(response) => response,
            Err(e) => {
                warn!(cache_key = %key, provider = self.provider.name(), error = %e, "Generation failed, serving fallback");
                self.metrics.record_fallback();
                return Ok(Generation {
                    content: GeneratedContent::fallback(verse, tier),
                    cached: false,
                    error: Some(GENERATION_FAILED.to_string()),
                });
            }
        };

        if let Some(usage) = response.usage {
            self.metrics
                .record_tokens(usage.prompt_tokens as u64, usage.completion_tokens as u64);
        }

        let fields = normalize(&response.content);
        if !fields.parsed {
            self.metrics.record_degraded_parse();
            let err = BibleError::Parse("no JSON object in model output".into());
            warn!(cache_key = %key, error = %err, "Using degraded content");
        }
        let content = GeneratedContent::assemble(verse, tier, fields);

        if let Err(e) = self.store.put(&key, &content).await {
            self.metrics.record_persistence_error();
            warn!(cache_key = %key, backend = self.store.backend(), error = %e, "Failed to cache content");
        }

        Ok(Generation {
            content,
            cached: false,
            error: None,
        })
    }

    /// Read-only probe of the store. Never calls the provider.
    pub async fn lookup(&self, verse: &str, age_group: &str) -> Result<Option<GeneratedContent>> {
        validate(verse, age_group)?;
        let key = CacheKey::from_request(verse, age_group);
        Ok(self.cached(&key).await)
    }

    /// Store read where a failure counts as a miss.
    async fn cached(&self, key: &CacheKey) -> Option<GeneratedContent> {
        match self.store.get(key).await {
            Ok(found) => found,
            Err(e) => {
                self.metrics.record_persistence_error();
                warn!(cache_key = %key, backend = self.store.backend(), error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }
}

fn validate(verse: &str, age_group: &str) -> Result<()> {
    if verse.trim().is_empty() || age_group.trim().is_empty() {
        return Err(BibleError::Validation(MISSING_FIELDS.to_string()));
    }
    Ok(())
}

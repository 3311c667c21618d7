//! Wiring shared by the command handlers.

use std::sync::Arc;

use anyhow::{Context, Result};

use better_bible::cache::{open_store, ContentStore};
use better_bible::config::Config;
use better_bible::content::ContentGenerator;
use better_bible::health::UsageMetrics;
use better_bible::providers::{ChatOptions, GeminiProvider, LLMProvider};

/// Everything a command needs to produce content.
pub(crate) struct Pipeline {
    pub generator: ContentGenerator,
    pub store: Arc<dyn ContentStore>,
    pub provider: Arc<dyn LLMProvider>,
    pub metrics: Arc<UsageMetrics>,
}

/// Open the configured store and provider and wire a generator over them.
pub(crate) async fn build_pipeline(config: &Config) -> Result<Pipeline> {
    let provider: Arc<dyn LLMProvider> = Arc::new(
        GeminiProvider::from_config(&config.provider)
            .context("Set GEMINI_API_KEY (or GOOGLE_API_KEY) to generate content")?,
    );
    let store = open_store(&config.cache).await;
    let metrics = Arc::new(UsageMetrics::new());

    let options = ChatOptions::json()
        .with_temperature(config.provider.temperature)
        .with_max_tokens(config.provider.max_output_tokens);
    let generator = ContentGenerator::new(store.clone(), provider.clone(), metrics.clone())
        .with_options(options);

    Ok(Pipeline {
        generator,
        store,
        provider,
        metrics,
    })
}

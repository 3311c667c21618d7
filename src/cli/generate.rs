//! `better-bible generate`: one-shot generation.

use anyhow::{Context, Result};
use serde_json::json;

use better_bible::config::Config;

use super::common::build_pipeline;

pub(crate) async fn cmd_generate(config: Config, verse: &str, age: &str) -> Result<()> {
    let pipeline = build_pipeline(&config).await?;
    let generation = pipeline
        .generator
        .generate(verse, age)
        .await
        .context("Invalid generation request")?;

    let output = json!({
        "content": generation.content,
        "cached": generation.cached,
        "error": generation.error,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    if generation.is_fallback() {
        anyhow::bail!("Content generation failed; placeholder content shown");
    }
    Ok(())
}

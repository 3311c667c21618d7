//! `better-bible cache`: sweep and statistics.

use anyhow::{Context, Result};

use better_bible::cache::open_store;
use better_bible::config::Config;

use super::CacheAction;

pub(crate) async fn cmd_cache(config: Config, action: CacheAction) -> Result<()> {
    let store = open_store(&config.cache).await;

    match action {
        CacheAction::Purge { days } => {
            let max_age = match days {
                Some(days) => chrono::Duration::days(i64::from(days)),
                None => config.cache.max_age(),
            };
            let removed = store
                .purge_older_than(max_age)
                .await
                .context("Failed to purge content cache")?;
            println!(
                "Removed {} entries older than {} days from the {} cache.",
                removed,
                max_age.num_days(),
                store.backend()
            );
        }
        CacheAction::Stats => {
            let count = store.len().await.context("Failed to count cache entries")?;
            println!("Backend: {}", store.backend());
            println!("Entries: {}", count);
            if store.backend() == "memory" {
                println!("(the memory backend starts empty on every run)");
            }
        }
    }

    Ok(())
}

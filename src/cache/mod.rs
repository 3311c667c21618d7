//! Content cache stores.
//!
//! A [`ContentStore`] is a plain associative store: `put` always overwrites,
//! `get` returns whatever was last put. There is no eviction and no TTL at
//! read time; old entries only disappear through
//! [`ContentStore::purge_older_than`].

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::{CacheBackend, CacheConfig};
use crate::content::{CacheKey, GeneratedContent};
use crate::error::Result;

/// Key/value persistence for generated content.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch the value stored at `key`, if any.
    async fn get(&self, key: &CacheKey) -> Result<Option<GeneratedContent>>;

    /// Store `value` at `key`, replacing any previous value.
    async fn put(&self, key: &CacheKey, value: &GeneratedContent) -> Result<()>;

    /// Remove entries last written before `now - max_age`. Returns the count removed.
    async fn purge_older_than(&self, max_age: chrono::Duration) -> Result<u64>;

    /// Number of stored entries.
    async fn len(&self) -> Result<u64>;

    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;
}

/// Oldest write time an entry may have and still survive a purge.
///
/// Saturates at the Unix epoch, so an arbitrarily large `max_age` removes
/// nothing instead of overflowing.
pub fn purge_cutoff(now: DateTime<Utc>, max_age: chrono::Duration) -> DateTime<Utc> {
    now.checked_sub_signed(max_age)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
        .max(DateTime::<Utc>::UNIX_EPOCH)
}

/// Build the store selected by `config`.
///
/// A postgres backend that cannot be reached or initialized degrades to the
/// in-memory store so the service still starts.
pub async fn open_store(config: &CacheConfig) -> Arc<dyn ContentStore> {
    match config.backend {
        CacheBackend::Memory => Arc::new(MemoryStore::new()),
        CacheBackend::File => {
            let path = config.resolved_snapshot_path();
            info!(path = %path.display(), "Using file-backed content cache");
            Arc::new(MemoryStore::with_snapshot(path))
        }
        CacheBackend::Postgres => {
            let Some(url) = config.database_url.as_deref() else {
                warn!("Postgres cache selected without a database URL; using in-memory cache");
                return Arc::new(MemoryStore::new());
            };
            match PostgresStore::connect(url, config.pool_size).await {
                Ok(store) => {
                    info!("Using postgres content cache");
                    Arc::new(store)
                }
                Err(e) => {
                    warn!(error = %e, "Postgres cache unavailable; using in-memory cache");
                    Arc::new(MemoryStore::new())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purge_cutoff_subtracts_max_age() {
        let now = Utc::now();
        assert_eq!(
            purge_cutoff(now, chrono::Duration::days(30)),
            now - chrono::Duration::days(30)
        );
    }

    #[test]
    fn test_purge_cutoff_saturates_on_huge_max_age() {
        let now = Utc::now();
        let days = chrono::Duration::days(i64::from(u32::MAX));
        assert_eq!(purge_cutoff(now, days), DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(
            purge_cutoff(now, chrono::Duration::MAX),
            DateTime::<Utc>::UNIX_EPOCH
        );
    }

    #[tokio::test]
    async fn test_open_store_memory_default() {
        let store = open_store(&CacheConfig::default()).await;
        assert_eq!(store.backend(), "memory");
        assert_eq!(store.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_open_store_file_backend() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = CacheConfig {
            backend: CacheBackend::File,
            snapshot_path: Some(dir.path().join("content.json")),
            ..CacheConfig::default()
        };
        let store = open_store(&config).await;
        assert_eq!(store.backend(), "file");
    }

    #[tokio::test]
    async fn test_open_store_postgres_without_url_degrades() {
        let config = CacheConfig {
            backend: CacheBackend::Postgres,
            database_url: None,
            ..CacheConfig::default()
        };
        let store = open_store(&config).await;
        assert_eq!(store.backend(), "memory");
    }
}

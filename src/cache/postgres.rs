//! PostgreSQL-backed content store.
//!
//! One row per cache key in `content_cache`, with the content stored as
//! JSONB. Writes upsert on the unique `cache_key`, so the last writer wins.

use async_trait::async_trait;
use chrono::Utc;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use serde_json::Value as JsonValue;
use tokio_postgres::NoTls;
use tracing::{debug, info};

use crate::content::{CacheKey, GeneratedContent};
use crate::error::{BibleError, Result};

use super::{purge_cutoff, ContentStore};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS content_cache (
    id          SERIAL PRIMARY KEY,
    cache_key   TEXT UNIQUE NOT NULL,
    verse       TEXT NOT NULL,
    age_group   VARCHAR(20) NOT NULL,
    content     JSONB NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_content_verse_age ON content_cache (verse, age_group);
CREATE INDEX IF NOT EXISTS idx_content_updated_at ON content_cache (updated_at);
"#;

const SELECT_SQL: &str = "SELECT content FROM content_cache WHERE cache_key = $1";

const UPSERT_SQL: &str = r#"
INSERT INTO content_cache (cache_key, verse, age_group, content)
VALUES ($1, $2, $3, $4)
ON CONFLICT (cache_key)
DO UPDATE SET content = EXCLUDED.content,
              verse = EXCLUDED.verse,
              age_group = EXCLUDED.age_group,
              updated_at = NOW()
"#;

const PURGE_SQL: &str = "DELETE FROM content_cache WHERE updated_at < $1";

const COUNT_SQL: &str = "SELECT COUNT(*) FROM content_cache";

/// Relational [`ContentStore`] over a deadpool connection pool.
#[derive(Clone)]
pub struct PostgresStore {
    pool: Pool,
}

impl PostgresStore {
    /// Wrap an existing pool. Does not touch the schema.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a pool for `url` and make sure the schema exists.
    pub async fn connect(url: &str, pool_size: usize) -> Result<Self> {
        let mut cfg = Config::new();
        cfg.url = Some(url.to_string());
        cfg.pool = Some(PoolConfig::new(pool_size.max(1)));
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| BibleError::Persistence(format!("failed to create pool: {}", e)))?;

        let store = Self::new(pool);
        store.init_schema().await?;
        Ok(store)
    }

    /// Create the `content_cache` table and indexes if missing. Idempotent.
    pub async fn init_schema(&self) -> Result<()> {
        let client = self.pool.get().await?;
        client.batch_execute(SCHEMA_SQL).await?;
        info!("Content cache schema ready");
        Ok(())
    }
}

#[async_trait]
impl ContentStore for PostgresStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<GeneratedContent>> {
        let client = self.pool.get().await?;
        let Some(row) = client.query_opt(SELECT_SQL, &[&key.as_str()]).await? else {
            return Ok(None);
        };
        let payload: JsonValue = row.try_get(0)?;
        let content = serde_json::from_value(payload).map_err(|e| {
            BibleError::Persistence(format!("stored content for '{}' is malformed: {}", key, e))
        })?;
        Ok(Some(content))
    }

    async fn put(&self, key: &CacheKey, value: &GeneratedContent) -> Result<()> {
        let payload = serde_json::to_value(value)?;
        let client = self.pool.get().await?;
        client
            .execute(
                UPSERT_SQL,
                &[
                    &key.as_str(),
                    &value.verse,
                    &value.age_group.label(),
                    &payload,
                ],
            )
            .await?;
        debug!(cache_key = %key, "Content upserted");
        Ok(())
    }

    async fn purge_older_than(&self, max_age: chrono::Duration) -> Result<u64> {
        let cutoff = purge_cutoff(Utc::now(), max_age);
        let client = self.pool.get().await?;
        let removed = client.execute(PURGE_SQL, &[&cutoff]).await?;
        Ok(removed)
    }

    async fn len(&self) -> Result<u64> {
        let client = self.pool.get().await?;
        let row = client.query_one(COUNT_SQL, &[]).await?;
        let count: i64 = row.try_get(0)?;
        Ok(count.max(0) as u64)
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

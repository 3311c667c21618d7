//! In-process content store with optional JSON snapshot persistence.
//!
//! Without a snapshot path the store is volatile and forgets everything on
//! restart. With one, the whole map is loaded at construction and rewritten
//! after every `put` and sweep. Each rewrite goes to a sibling `.tmp` file
//! that is renamed over the snapshot, so a crash never leaves a torn file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::content::{CacheKey, GeneratedContent};
use crate::error::{BibleError, Result};

use super::{purge_cutoff, ContentStore};

/// A stored value plus the time it was last written.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    content: GeneratedContent,
    updated_at: DateTime<Utc>,
}

/// Snapshot layout serialized to JSON.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    entries: HashMap<CacheKey, StoredEntry>,
}

/// Map-backed [`ContentStore`].
pub struct MemoryStore {
    entries: RwLock<HashMap<CacheKey, StoredEntry>>,
    snapshot: Option<PathBuf>,
    /// Serializes snapshot rewrites so a stale map never lands last.
    save_lock: tokio::sync::Mutex<()>,
}

impl MemoryStore {
    /// Volatile store, cleared on process restart.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            snapshot: None,
            save_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Store persisted to `path`, loading any existing snapshot.
    pub fn with_snapshot(path: PathBuf) -> Self {
        let snapshot = Self::load_from_disk(&path);
        Self {
            entries: RwLock::new(snapshot.entries),
            snapshot: Some(path),
            save_lock: tokio::sync::Mutex::new(()),
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<CacheKey, StoredEntry>>> {
        self.entries
            .read()
            .map_err(|_| BibleError::Persistence("content cache lock poisoned".into()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<CacheKey, StoredEntry>>> {
        self.entries
            .write()
            .map_err(|_| BibleError::Persistence("content cache lock poisoned".into()))
    }

    fn load_from_disk(path: &Path) -> Snapshot {
        match std::fs::read_to_string(path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!("Content cache snapshot is corrupt, starting empty: {}", e);
                    Snapshot::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Snapshot::default(),
            Err(e) => {
                warn!("Failed to read content cache snapshot, starting empty: {}", e);
                Snapshot::default()
            }
        }
    }

    /// Write the current map to the snapshot file, if one is configured.
    ///
    /// The map is serialized under the read lock; file I/O happens after it
    /// is released.
    async fn save_to_disk(&self) -> Result<()> {
        let Some(path) = self.snapshot.as_ref() else {
            return Ok(());
        };
        let _guard = self.save_lock.lock().await;
        let data = serde_json::to_string_pretty(&SnapshotRef {
            entries: &*self.read()?,
        })?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BibleError::Persistence(format!("create cache dir: {}", e)))?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data)
            .await
            .map_err(|e| BibleError::Persistence(format!("write cache snapshot: {}", e)))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| BibleError::Persistence(format!("replace cache snapshot: {}", e)))
    }
}

/// Borrowed view of [`Snapshot`] so saving doesn't clone the map.
#[derive(Serialize)]
struct SnapshotRef<'a> {
    entries: &'a HashMap<CacheKey, StoredEntry>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<GeneratedContent>> {
        Ok(self.read()?.get(key).map(|e| e.content.clone()))
    }

    async fn put(&self, key: &CacheKey, value: &GeneratedContent) -> Result<()> {
        self.write()?.insert(
            key.clone(),
            StoredEntry {
                content: value.clone(),
                updated_at: Utc::now(),
            },
        );
        self.save_to_disk().await
    }

    async fn purge_older_than(&self, max_age: chrono::Duration) -> Result<u64> {
        let cutoff = purge_cutoff(Utc::now(), max_age);
        let removed = {
            let mut entries = self.write()?;
            let before = entries.len();
            entries.retain(|_, e| e.updated_at >= cutoff);
            (before - entries.len()) as u64
        };
        if removed > 0 {
            debug!(removed, "Swept stale content cache entries");
            self.save_to_disk().await?;
        }
        Ok(removed)
    }

    async fn len(&self) -> Result<u64> {
        Ok(self.read()?.len() as u64)
    }

    fn backend(&self) -> &'static str {
        if self.snapshot.is_some() {
            "file"
        } else {
            "memory"
        }
    }
}

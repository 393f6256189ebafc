//! Time-bounded cache for provider lookups.
//!
//! Entries live in a SQLite database so they survive restarts and can be
//! shared between processes; SQLite's own locking serializes writers. An
//! in-process map mirrors entries read or written by this process. Both
//! layers apply the same rule: an entry is a hit while
//! `now - inserted_at <= ttl`.
//!
//! Expiry is purely time-based. Nothing evicts entries by count or size.

use crate::models::config::CacheConfig;
use crate::models::episode::CanonicalEpisode;
use crate::services::provider::{EpisodeProvider, EpisodeQuery};
use crate::utils::hash::sha256_hex;
use crate::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// One cached value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Hash of the operation identity and its arguments.
    pub key: String,
    /// Operation identity, kept for inspection.
    pub operation: String,
    /// JSON-encoded value.
    pub value: String,
    /// Insertion time, milliseconds since the Unix epoch.
    pub inserted_at: i64,
    /// Lifetime in seconds.
    pub ttl_secs: u64,
}

impl CacheEntry {
    /// Whether the entry is still a valid hit at `now` (milliseconds).
    pub fn is_live(&self, now: i64) -> bool {
        let ttl_millis = i64::try_from(self.ttl_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
        now - self.inserted_at <= ttl_millis
    }
}

/// Current time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// On-disk SQLite store of cache entries.
///
/// Every operation opens its own connection, so the store can be moved into
/// blocking tasks freely.
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::CacheIo(format!("cannot create {}: {}", parent.display(), e))
                })?;
            }
        }

        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                operation TEXT NOT NULL,
                value TEXT NOT NULL,
                inserted_at INTEGER NOT NULL,
                ttl_secs INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_cache_entries_operation
                ON cache_entries(operation);",
        )?;
        Ok(conn)
    }

    /// Read an entry, live or not.
    pub fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let conn = self.open()?;
        let entry = conn
            .query_row(
                "SELECT key, operation, value, inserted_at, ttl_secs
                 FROM cache_entries WHERE key = ?1",
                params![key],
                |row| {
                    Ok(CacheEntry {
                        key: row.get(0)?,
                        operation: row.get(1)?,
                        value: row.get(2)?,
                        inserted_at: row.get(3)?,
                        ttl_secs: row.get::<_, i64>(4)?.max(0) as u64,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }

    /// Insert or replace an entry in a single statement.
    pub fn put(&self, entry: &CacheEntry) -> Result<()> {
        let conn = self.open()?;
        let ttl = i64::try_from(entry.ttl_secs).unwrap_or(i64::MAX);
        conn.execute(
            "INSERT OR REPLACE INTO cache_entries (key, operation, value, inserted_at, ttl_secs)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![entry.key, entry.operation, entry.value, entry.inserted_at, ttl],
        )?;
        Ok(())
    }

    /// Delete entries that are no longer live at `now`. Returns the number of
    /// rows removed.
    pub fn purge_expired(&self, now: i64) -> Result<usize> {
        let conn = self.open()?;
        let removed = conn.execute(
            "DELETE FROM cache_entries WHERE ?1 - inserted_at > ttl_secs * 1000",
            params![now],
        )?;
        Ok(removed)
    }

    /// Number of stored entries, live or not.
    pub fn len(&self) -> Result<usize> {
        let conn = self.open()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// Memoizes asynchronous fetches by operation identity and arguments.
///
/// Concurrent callers racing on the same key both miss and both fetch; the
/// later write wins.
#[derive(Debug)]
pub struct ProviderCache {
    store: Option<CacheStore>,
    ttl_secs: u64,
    memory: Mutex<HashMap<String, CacheEntry>>,
}

impl ProviderCache {
    /// Create a cache from configuration. A disabled config bypasses both
    /// layers.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            store: config.enabled.then(|| CacheStore::new(&config.path)),
            ttl_secs: config.ttl_secs,
            memory: Mutex::new(HashMap::new()),
        }
    }

    /// A cache that always calls through.
    pub fn disabled() -> Self {
        Self {
            store: None,
            ttl_secs: 0,
            memory: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Stable key for an operation and its ordered arguments.
    pub fn key<A: Serialize + ?Sized>(operation: &str, args: &A) -> Result<String> {
        let encoded = serde_json::to_string(args)?;
        Ok(sha256_hex(format!("{}\u{0}{}", operation, encoded).as_bytes()))
    }

    /// Return the cached value for `operation(args)`, or run `fetch` and
    /// cache its result.
    ///
    /// Only a successful fetch is written. When the store cannot be read,
    /// the fetch runs uncached.
    pub async fn get_or_fetch<T, A, F, Fut>(&self, operation: &str, args: &A, fetch: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        A: Serialize + ?Sized,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let Some(store) = &self.store else {
            return fetch().await;
        };

        let key = Self::key(operation, args)?;

        if let Some(value) = self.memory_get(&key, now_millis()) {
            match serde_json::from_str(&value) {
                Ok(decoded) => {
                    tracing::debug!("Cache hit (memory) for {}", operation);
                    return Ok(decoded);
                }
                Err(e) => tracing::warn!("Discarding undecodable cache entry: {}", e),
            }
        }

        match self.store_get(store, &key).await {
            Ok(Some(entry)) if entry.is_live(now_millis()) => {
                match serde_json::from_str(&entry.value) {
                    Ok(decoded) => {
                        tracing::debug!("Cache hit for {}", operation);
                        self.memory_put(entry);
                        return Ok(decoded);
                    }
                    Err(e) => tracing::warn!("Discarding undecodable cache entry: {}", e),
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Cache store unavailable, fetching directly: {}", e);
                return fetch().await;
            }
        }

        tracing::debug!("Cache miss for {}", operation);
        let value = fetch().await?;

        let entry = CacheEntry {
            key,
            operation: operation.to_string(),
            value: serde_json::to_string(&value)?,
            inserted_at: now_millis(),
            ttl_secs: self.ttl_secs,
        };
        if let Err(e) = self.store_put(store, entry.clone()).await {
            tracing::warn!("Failed to write cache entry: {}", e);
        }
        self.memory_put(entry);

        Ok(value)
    }

    /// Remove expired entries from both layers.
    pub async fn purge_expired(&self) -> Result<usize> {
        let now = now_millis();
        if let Ok(mut memory) = self.memory.lock() {
            memory.retain(|_, entry| entry.is_live(now));
        }

        let Some(store) = self.store.clone() else {
            return Ok(0);
        };
        let removed = tokio::task::spawn_blocking(move || store.purge_expired(now))
            .await
            .map_err(|e| Error::CacheIo(e.to_string()))??;
        tracing::info!("Purged {} expired cache entries", removed);
        Ok(removed)
    }

    fn memory_get(&self, key: &str, now: i64) -> Option<String> {
        let mut memory = self.memory.lock().ok()?;
        let entry = memory.get(key)?;
        if entry.is_live(now) {
            return Some(entry.value.clone());
        }
        memory.remove(key);
        None
    }

    fn memory_put(&self, entry: CacheEntry) {
        if let Ok(mut memory) = self.memory.lock() {
            memory.insert(entry.key.clone(), entry);
        }
    }

    async fn store_get(&self, store: &CacheStore, key: &str) -> Result<Option<CacheEntry>> {
        let store = store.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || store.get(&key))
            .await
            .map_err(|e| Error::CacheIo(e.to_string()))?
    }

    async fn store_put(&self, store: &CacheStore, entry: CacheEntry) -> Result<()> {
        let store = store.clone();
        tokio::task::spawn_blocking(move || store.put(&entry))
            .await
            .map_err(|e| Error::CacheIo(e.to_string()))?
    }
}

/// An [`EpisodeProvider`] whose lookups go through a [`ProviderCache`].
pub struct CachedProvider<P> {
    inner: P,
    cache: Arc<ProviderCache>,
}

impl<P: EpisodeProvider> CachedProvider<P> {
    pub fn new(inner: P, cache: Arc<ProviderCache>) -> Self {
        Self { inner, cache }
    }
}

impl<P: EpisodeProvider> EpisodeProvider for CachedProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn fetch_episode_list(
        &self,
        query: &EpisodeQuery,
    ) -> impl Future<Output = Result<Vec<CanonicalEpisode>>> + Send {
        async move {
            let operation = format!("{}::fetch_episode_list", self.inner.name());
            self.cache
                .get_or_fetch(&operation, query, || self.inner.fetch_episode_list(query))
                .await
        }
    }
}

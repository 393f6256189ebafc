//! Integration tests for the provider cache.
//!
//! Tests cover:
//! - Hits within the time-to-live and refetch after it
//! - Failed and cancelled fetches leaving no entry
//! - Persistence across cache instances
//! - Bypass when disabled or when the store is unreachable

use media_renamer::models::config::CacheConfig;
use media_renamer::models::episode::CanonicalEpisode;
use media_renamer::services::cache::{CacheStore, CachedProvider, ProviderCache};
use media_renamer::services::provider::{EpisodeProvider, EpisodeQuery};
use media_renamer::{Error, Result};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct CountingProvider {
    calls: Arc<AtomicUsize>,
}

impl EpisodeProvider for CountingProvider {
    fn name(&self) -> &str {
        "counting"
    }

    fn fetch_episode_list(
        &self,
        query: &EpisodeQuery,
    ) -> impl Future<Output = Result<Vec<CanonicalEpisode>>> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let episodes = vec![CanonicalEpisode::new(query.season, 1, "Magic Xylophone")];
        async move { Ok(episodes) }
    }
}

fn cache_in(dir: &TempDir, ttl_secs: u64) -> ProviderCache {
    ProviderCache::new(&CacheConfig::at(dir.path().join("cache.db"), ttl_secs))
}

async fn counted_fetch(cache: &ProviderCache, calls: &AtomicUsize, season: u16) -> Result<Vec<u16>> {
    cache
        .get_or_fetch("fake::episodes", &("Bluey", season), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![season, 1, 2])
        })
        .await
}

#[tokio::test]
async fn test_hit_within_ttl_then_refetch() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir, 1);
    let calls = AtomicUsize::new(0);

    let first = counted_fetch(&cache, &calls, 1).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let second = counted_fetch(&cache, &calls, 1).await.unwrap();
    assert_eq!(second, first);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_millis(1100)).await;
    counted_fetch(&cache, &calls, 1).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_distinct_arguments_are_distinct_entries() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir, 60);
    let calls = AtomicUsize::new(0);

    counted_fetch(&cache, &calls, 1).await.unwrap();
    counted_fetch(&cache, &calls, 2).await.unwrap();
    counted_fetch(&cache, &calls, 1).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(CacheStore::new(dir.path().join("cache.db")).len().unwrap(), 2);
}

#[tokio::test]
async fn test_failed_fetch_is_not_cached() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir, 60);

    let result: Result<Vec<u16>> = cache
        .get_or_fetch("fake::episodes", &("Bluey", 1), || async {
            Err(Error::ProviderUnavailable("timeout".into()))
        })
        .await;
    assert!(matches!(result, Err(Error::ProviderUnavailable(_))));

    let store = CacheStore::new(dir.path().join("cache.db"));
    assert!(store.is_empty().unwrap());

    let calls = AtomicUsize::new(0);
    counted_fetch(&cache, &calls, 1).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancelled_fetch_is_not_cached() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir, 60);

    let pending = cache.get_or_fetch("fake::slow", &("Bluey", 1), || async {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(vec![1u16])
    });
    let outcome = tokio::time::timeout(Duration::from_millis(200), pending).await;
    assert!(outcome.is_err());

    let store = CacheStore::new(dir.path().join("cache.db"));
    assert!(store.is_empty().unwrap());
}

#[tokio::test]
async fn test_entries_persist_across_instances() {
    let dir = TempDir::new().unwrap();
    let calls = AtomicUsize::new(0);

    counted_fetch(&cache_in(&dir, 60), &calls, 1).await.unwrap();
    let reopened = cache_in(&dir, 60);
    let value = counted_fetch(&reopened, &calls, 1).await.unwrap();

    assert_eq!(value, vec![1, 1, 2]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_disabled_cache_always_fetches() {
    let dir = TempDir::new().unwrap();
    let mut config = CacheConfig::at(dir.path().join("cache.db"), 60);
    config.enabled = false;
    let cache = ProviderCache::new(&config);
    let calls = AtomicUsize::new(0);

    counted_fetch(&cache, &calls, 1).await.unwrap();
    counted_fetch(&cache, &calls, 1).await.unwrap();

    assert!(!cache.is_enabled());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(!dir.path().join("cache.db").exists());
}

#[tokio::test]
async fn test_unreachable_store_falls_back_to_fetch() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "file").unwrap();
    let cache = ProviderCache::new(&CacheConfig::at(blocker.join("cache.db"), 60));
    let calls = AtomicUsize::new(0);

    let value = counted_fetch(&cache, &calls, 3).await.unwrap();
    counted_fetch(&cache, &calls, 3).await.unwrap();

    assert_eq!(value, vec![3, 1, 2]);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_purge_expired() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir, 0);
    let calls = AtomicUsize::new(0);

    counted_fetch(&cache, &calls, 1).await.unwrap();
    counted_fetch(&cache, &calls, 2).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(cache.purge_expired().await.unwrap(), 2);
    assert!(CacheStore::new(dir.path().join("cache.db")).is_empty().unwrap());
}

#[tokio::test]
async fn test_cached_provider_memoizes_lookups() {
    let dir = TempDir::new().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let provider = CachedProvider::new(
        CountingProvider {
            calls: calls.clone(),
        },
        Arc::new(cache_in(&dir, 60)),
    );

    let query = EpisodeQuery::new("Bluey", 1);
    let first = provider.fetch_episode_list(&query).await.unwrap();
    let second = provider.fetch_episode_list(&query).await.unwrap();
    provider
        .fetch_episode_list(&EpisodeQuery::new("Bluey", 2))
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first[0].title, "Magic Xylophone");
    assert_eq!(provider.name(), "counting");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

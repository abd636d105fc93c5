//! In-process result cache.
//!
//! Backed by a bounded moka cache with per-entry TTL, since a single-paper
//! lookup and a broad search carry different lifetimes through the same
//! store.

use crate::cache::ResultCache;
use crate::client::aggregator::AggregatedResultSet;
use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone)]
struct Slot {
    set: Arc<AggregatedResultSet>,
    ttl: Duration,
}

struct SlotExpiry;

impl Expiry<String, Slot> for SlotExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Slot,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Bounded in-process store of merged result sets.
pub struct MemoryCache {
    inner: Cache<String, Slot>,
}

impl MemoryCache {
    #[must_use]
    pub fn new(max_entries: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_entries)
                .expire_after(SlotExpiry)
                .build(),
        }
    }

    /// Entry count, for logging and tests. moka maintains this lazily;
    /// `run_pending_tasks` makes it exact.
    pub async fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.entry_count()
    }
}

#[async_trait]
impl ResultCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<Arc<AggregatedResultSet>> {
        self.inner.get(key).await.map(|slot| slot.set)
    }

    async fn put(&self, key: &str, value: Arc<AggregatedResultSet>, ttl: Duration) {
        self.inner
            .insert(key.to_string(), Slot { set: value, ttl })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn result_set() -> Arc<AggregatedResultSet> {
        Arc::new(AggregatedResultSet {
            papers: Vec::new(),
            sources_queried: vec!["eric".to_string()],
            source_status: BTreeMap::new(),
        })
    }

    #[tokio::test]
    async fn test_round_trip() {
        let cache = MemoryCache::new(16);
        assert!(cache.get("k").await.is_none());

        cache.put("k", result_set(), Duration::from_secs(60)).await;
        let hit = cache.get("k").await.expect("entry should be present");
        assert_eq!(hit.sources_queried, vec!["eric".to_string()]);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let cache = MemoryCache::new(16);
        cache.put("k", result_set(), Duration::from_secs(60)).await;

        let mut replacement = AggregatedResultSet {
            papers: Vec::new(),
            sources_queried: vec!["doaj".to_string()],
            source_status: BTreeMap::new(),
        };
        replacement.sources_queried.push("core".to_string());
        cache
            .put("k", Arc::new(replacement), Duration::from_secs(60))
            .await;

        let hit = cache.get("k").await.expect("entry should be present");
        assert_eq!(hit.sources_queried.len(), 2);
    }

    #[tokio::test]
    async fn test_entries_expire_after_their_own_ttl() {
        let cache = MemoryCache::new(16);
        cache
            .put("short", result_set(), Duration::from_millis(50))
            .await;
        cache.put("long", result_set(), Duration::from_secs(300)).await;

        tokio::time::sleep(Duration::from_millis(120)).await;

        assert!(cache.get("short").await.is_none());
        assert!(cache.get("long").await.is_some());
    }
}

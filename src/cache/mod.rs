//! Result-set caching.
//!
//! One full merged, deduplicated, ranked [`AggregatedResultSet`] is the
//! unit of caching; pages are sliced from it on every hit, so the key
//! deliberately excludes `page` and `per_page`. Two stores implement one
//! [`ResultCache`] trait: an in-process store and a shared remote cache
//! service that degrades to the in-process tier when unreachable. The
//! aggregator only ever sees the trait.

pub mod memory;
pub mod remote;

pub use memory::MemoryCache;
pub use remote::RemoteCache;

use crate::client::aggregator::AggregatedResultSet;
use crate::client::providers::SearchQuery;
use crate::config::CacheConfig;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Keyed store of complete merged result sets.
///
/// `put` racing another writer for the same key is fine: both writers
/// computed from logically-equivalent input, so last-writer-wins.
#[async_trait]
pub trait ResultCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<Arc<AggregatedResultSet>>;
    async fn put(&self, key: &str, value: Arc<AggregatedResultSet>, ttl: Duration);
}

/// Deterministic cache key for a search.
///
/// Hash of the normalized query shape: trimmed lower-cased text, every
/// filter, the sort order, and the sorted source selection. Pagination
/// fields and credentials never enter the key.
#[must_use]
pub fn result_key(query: &SearchQuery) -> String {
    let mut sources: Vec<String> = query
        .sources
        .as_deref()
        .unwrap_or(&[])
        .iter()
        .map(|s| s.trim().to_lowercase())
        .collect();
    sources.sort();

    let canonical = format!(
        "q:{}|ys:{}|ye:{}|d:{}|el:{}|pt:{}|st:{}|mc:{}|sort:{}|src:{}",
        query.query.trim().to_lowercase(),
        opt_num(query.year_start),
        opt_num(query.year_end),
        opt_str(query.discipline.as_deref()),
        opt_str(query.education_level.as_deref()),
        opt_str(query.publication_type.as_deref()),
        opt_str(query.study_type.as_deref()),
        opt_num(query.min_citations),
        query.sort_by,
        sources.join(",")
    );

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn opt_num<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(String::new, |v| v.to_string())
}

fn opt_str(value: Option<&str>) -> String {
    value.map_or_else(String::new, |v| v.trim().to_lowercase())
}

/// TTL for a query by its logical shape: a bare-DOI lookup changes
/// rarely and keeps, a broad search expires sooner.
#[must_use]
pub fn ttl_for(query: &SearchQuery, config: &CacheConfig) -> Duration {
    if query.is_doi_lookup() {
        Duration::from_secs(config.lookup_ttl_secs)
    } else {
        Duration::from_secs(config.broad_ttl_secs)
    }
}

/// Builds the cache tier the configuration asks for: remote-with-fallback
/// when a cache service URL is configured, otherwise in-process only.
pub fn build_cache(config: &CacheConfig) -> crate::Result<Arc<dyn ResultCache>> {
    match &config.remote_url {
        Some(url) => {
            debug!(url, "using shared cache service with in-process fallback");
            Ok(Arc::new(RemoteCache::new(url, config)?))
        }
        None => {
            debug!("using in-process result cache");
            Ok(Arc::new(MemoryCache::new(config.max_entries)))
        }
    }
}

//! Shared cache service client.
//!
//! Speaks a plain key-value protocol over HTTP: `GET {base}/cache/{key}`
//! returns the JSON result set or 404, `PUT {base}/cache/{key}?ttl_secs=N`
//! stores one. Every transport or decode failure degrades to an embedded
//! in-process tier and is logged; callers never observe the difference
//! beyond losing cross-process sharing.

use crate::cache::{MemoryCache, ResultCache};
use crate::client::aggregator::AggregatedResultSet;
use crate::client::{HttpClientConfig, SecureHttpClientFactory};
use crate::config::CacheConfig;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Remote cache tier with transparent in-process fallback.
pub struct RemoteCache {
    http: reqwest::Client,
    base_url: Url,
    fallback: MemoryCache,
}

impl RemoteCache {
    pub fn new(base_url: &str, config: &CacheConfig) -> crate::Result<Self> {
        let mut base_url = Url::parse(base_url).map_err(|e| crate::Error::InvalidInput {
            field: "cache.remote_url".to_string(),
            reason: format!("not a valid URL: {e}"),
        })?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        // Cache round-trips must stay cheap relative to a live search
        let http = SecureHttpClientFactory::create_client(&HttpClientConfig {
            timeout: Duration::from_secs(2),
            connect_timeout: Duration::from_secs(1),
            allow_http: base_url.scheme() == "http",
            ..HttpClientConfig::default()
        })?;

        Ok(Self {
            http,
            base_url,
            fallback: MemoryCache::new(config.max_entries),
        })
    }

    fn entry_url(&self, key: &str) -> Option<Url> {
        self.base_url.join(&format!("cache/{key}")).ok()
    }
}

#[async_trait]
impl ResultCache for RemoteCache {
    async fn get(&self, key: &str) -> Option<Arc<AggregatedResultSet>> {
        let Some(url) = self.entry_url(key) else {
            return self.fallback.get(key).await;
        };

        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(key, error = %e, "cache service unreachable, serving in-process tier");
                return self.fallback.get(key).await;
            }
        };

        match response.status() {
            StatusCode::NOT_FOUND => {
                // The entry may have been written locally during an outage
                self.fallback.get(key).await
            }
            status if status.is_success() => match response.json::<AggregatedResultSet>().await {
                Ok(set) => Some(Arc::new(set)),
                Err(e) => {
                    warn!(key, error = %e, "cache service returned undecodable entry");
                    self.fallback.get(key).await
                }
            },
            status => {
                warn!(key, %status, "cache service error, serving in-process tier");
                self.fallback.get(key).await
            }
        }
    }

    async fn put(&self, key: &str, value: Arc<AggregatedResultSet>, ttl: Duration) {
        let Some(url) = self.entry_url(key) else {
            self.fallback.put(key, value, ttl).await;
            return;
        };

        let result = self
            .http
            .put(url)
            .query(&[("ttl_secs", ttl.as_secs().to_string())])
            .json(value.as_ref())
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!(key, ttl_secs = ttl.as_secs(), "stored result set in cache service");
            }
            Ok(response) => {
                warn!(key, status = %response.status(), "cache service rejected put, storing in-process");
                self.fallback.put(key, value, ttl).await;
            }
            Err(e) => {
                warn!(key, error = %e, "cache service unreachable, storing in-process");
                self.fallback.put(key, value, ttl).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config() -> CacheConfig {
        CacheConfig::default()
    }

    fn result_set() -> AggregatedResultSet {
        AggregatedResultSet {
            papers: Vec::new(),
            sources_queried: vec!["eric".to_string()],
            source_status: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn test_get_hit_decodes_remote_entry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cache/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(result_set()))
            .mount(&server)
            .await;

        let cache = RemoteCache::new(&server.uri(), &config()).unwrap();
        let hit = cache.get("abc").await.expect("remote entry should decode");
        assert_eq!(hit.sources_queried, vec!["eric".to_string()]);
    }

    #[tokio::test]
    async fn test_get_miss_returns_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cache/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let cache = RemoteCache::new(&server.uri(), &config()).unwrap();
        assert!(cache.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_put_sends_ttl() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/cache/abc"))
            .and(query_param("ttl_secs", "600"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let cache = RemoteCache::new(&server.uri(), &config()).unwrap();
        cache
            .put("abc", Arc::new(result_set()), Duration::from_secs(600))
            .await;
    }

    #[tokio::test]
    async fn test_unreachable_service_degrades_to_in_process() {
        // Nothing listens here; every call fails fast
        let cache = RemoteCache::new("http://127.0.0.1:9", &config()).unwrap();

        cache
            .put("abc", Arc::new(result_set()), Duration::from_secs(60))
            .await;
        let hit = cache
            .get("abc")
            .await
            .expect("fallback tier should hold the entry");
        assert_eq!(hit.sources_queried, vec!["eric".to_string()]);
    }
}

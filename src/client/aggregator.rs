//! Federated search orchestration.
//!
//! One request moves through a fixed lifecycle: validate, cache check,
//! dispatch, collect, merge, cache, paginate. Fan-out to the selected
//! adapters is concurrent and bounded; every per-source failure degrades
//! to a `source_status` entry instead of failing the search. Only invalid
//! input, or every selected source failing, produces an error.
//!
//! The full merged result set is cached as a whole and pages are sliced
//! from it on the way out, so a repeat query with a different `page`
//! dispatches nothing.

use crate::cache::{build_cache, result_key, ttl_for, ResultCache};
use crate::client::providers::{
    apply_post_filters, build_adapters, AdapterError, SearchContext, SearchQuery, SourceAdapter,
    SourceDescriptor, SourceStatus,
};
use crate::client::{NormalizedPaper, RateGovernor};
use crate::config::Config;
use crate::services::{deduplicate, rank, sanitize_paper, sanitize_query_text};
use crate::{Error, Result};
use futures::future::join_all;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

type AdapterOutcome = (String, std::result::Result<Vec<NormalizedPaper>, AdapterError>);

/// Complete merged result set for one logical query, the unit of caching.
///
/// `sources_queried` lists the adapters actually dispatched, in dispatch
/// order; adapters short-circuited for a missing credential appear only in
/// `source_status`. `papers` is already deduplicated and ranked, so a
/// cache hit replays the stored order exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResultSet {
    pub papers: Vec<NormalizedPaper>,
    pub sources_queried: Vec<String>,
    pub source_status: BTreeMap<String, SourceStatus>,
}

/// One page of results, as returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchResponse {
    /// Size of the full merged result set, before pagination
    pub total_results: usize,
    /// The requested page of the ranked set
    pub papers: Vec<NormalizedPaper>,
    /// Adapters dispatched for this result set, in dispatch order
    pub sources_queried: Vec<String>,
    /// Outcome per selected adapter, including never-dispatched ones
    #[schemars(with = "BTreeMap<String, String>")]
    pub source_status: BTreeMap<String, SourceStatus>,
}

/// Orchestrator owning the adapter registry, the rate governor, and the
/// result cache.
///
/// One instance serves many concurrent searches; the governor's spacing
/// guarantees hold across all of them.
pub struct Aggregator {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    governor: Arc<RateGovernor>,
    cache: Arc<dyn ResultCache>,
    config: Arc<Config>,
}

impl Aggregator {
    /// Builds the registry from configuration: every enabled adapter, a
    /// governor seeded from descriptor intervals, and the configured cache
    /// tier.
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let adapters = build_adapters(&config)?;
        Self::with_adapters(config, adapters)
    }

    /// Builds an aggregator over an explicit adapter set. Construction
    /// seam for tests and embedders with custom sources.
    pub fn with_adapters(
        config: Arc<Config>,
        adapters: Vec<Arc<dyn SourceAdapter>>,
    ) -> Result<Self> {
        let governor = Arc::new(Self::build_governor(&config, &adapters));
        let cache = build_cache(&config.cache)?;
        info!(sources = adapters.len(), "initialized source registry");
        Ok(Self {
            adapters,
            governor,
            cache,
            config,
        })
    }

    fn build_governor(config: &Config, adapters: &[Arc<dyn SourceAdapter>]) -> RateGovernor {
        let mut governor =
            RateGovernor::new(Duration::from_millis(config.sources.default_interval_ms));
        for adapter in adapters {
            let descriptor = adapter.descriptor();
            let interval = config
                .sources
                .min_interval_ms
                .get(descriptor.name)
                .map_or(descriptor.min_interval, |ms| Duration::from_millis(*ms));
            governor.register(descriptor.name, interval);
        }
        governor
    }

    /// Static descriptors for every registered adapter, in registry order.
    #[must_use]
    pub fn descriptors(&self) -> Vec<SourceDescriptor> {
        self.adapters.iter().map(|a| a.descriptor()).collect()
    }

    /// Runs the full search lifecycle for one query.
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        // Adapters and the cache key only ever see cleaned query text
        let query = SearchQuery {
            query: sanitize_query_text(&query.query),
            ..query.clone()
        };
        self.validate(&query)?;

        let key = result_key(&query);
        if let Some(cached) = self.cache.get(&key).await {
            debug!(key = %key, "serving search from cached result set");
            return Ok(Self::paginate(&cached, &query));
        }

        let selected = self.select_adapters(&query)?;
        debug!(query = ?query, sources = selected.len(), "starting federated search");

        let merged = Arc::new(self.dispatch_and_merge(&query, &selected).await?);

        self.cache
            .put(&key, Arc::clone(&merged), ttl_for(&query, &self.config.cache))
            .await;

        Ok(Self::paginate(&merged, &query))
    }

    /// Probes every registered adapter concurrently. A rate-limited
    /// provider still counts as available.
    pub async fn health_check(&self) -> BTreeMap<String, bool> {
        let context = SearchContext {
            timeout: Duration::from_secs(self.config.search.source_timeout_secs),
            ..SearchContext::default()
        };

        let probes = self.adapters.iter().map(|adapter| {
            let adapter = Arc::clone(adapter);
            let governor = Arc::clone(&self.governor);
            let context = context.clone();
            async move {
                governor.acquire(adapter.name()).await;
                let healthy = adapter.health_check(&context).await.unwrap_or(false);
                (adapter.name().to_string(), healthy)
            }
        });

        let mut results = BTreeMap::new();
        for (name, healthy) in join_all(probes).await {
            if healthy {
                info!(source = %name, "source is healthy");
            } else {
                warn!(source = %name, "source is unhealthy");
            }
            results.insert(name, healthy);
        }
        results
    }

    /// Pre-dispatch input validation. Everything rejected here fails the
    /// request before any cache or network activity.
    fn validate(&self, query: &SearchQuery) -> Result<()> {
        let search = &self.config.search;

        if query.query.trim().is_empty() {
            return Err(Error::InvalidInput {
                field: "query".to_string(),
                reason: "query text must not be empty".to_string(),
            });
        }
        let length = query.query.chars().count();
        if length > search.max_query_length {
            return Err(Error::InvalidInput {
                field: "query".to_string(),
                reason: format!(
                    "query length {length} exceeds the maximum of {}",
                    search.max_query_length
                ),
            });
        }
        if query.per_page == 0 {
            return Err(Error::InvalidInput {
                field: "per_page".to_string(),
                reason: "per_page must be at least 1".to_string(),
            });
        }
        if query.per_page > search.max_per_page {
            return Err(Error::InvalidInput {
                field: "per_page".to_string(),
                reason: format!(
                    "per_page {} exceeds the maximum of {}",
                    query.per_page, search.max_per_page
                ),
            });
        }
        if let (Some(start), Some(end)) = (query.year_start, query.year_end) {
            if start > end {
                return Err(Error::InvalidInput {
                    field: "year_start".to_string(),
                    reason: format!("year_start ({start}) is after year_end ({end})"),
                });
            }
        }
        if let Some(sources) = &query.sources {
            if sources.is_empty() {
                return Err(Error::InvalidInput {
                    field: "sources".to_string(),
                    reason: "source selection must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Resolves the query's source selection against the registry.
    /// `None` selects every registered adapter; explicit names must all
    /// resolve or the request is rejected, so `sources_queried` can never
    /// silently disagree with what the caller asked for.
    fn select_adapters(&self, query: &SearchQuery) -> Result<Vec<Arc<dyn SourceAdapter>>> {
        let Some(names) = &query.sources else {
            return Ok(self.adapters.clone());
        };

        let mut selected: Vec<Arc<dyn SourceAdapter>> = Vec::with_capacity(names.len());
        for name in names {
            let wanted = name.trim().to_lowercase();
            if selected.iter().any(|a| a.name() == wanted.as_str()) {
                continue;
            }
            let adapter = self
                .adapters
                .iter()
                .find(|a| a.name() == wanted.as_str())
                .ok_or_else(|| Error::InvalidInput {
                    field: "sources".to_string(),
                    reason: format!("unknown or disabled source '{}'", name.trim()),
                })?;
            selected.push(Arc::clone(adapter));
        }
        Ok(selected)
    }

    /// Fans the query out to the selected adapters and runs the merge
    /// pipeline over everything that arrives before the deadline.
    async fn dispatch_and_merge(
        &self,
        query: &SearchQuery,
        selected: &[Arc<dyn SourceAdapter>],
    ) -> Result<AggregatedResultSet> {
        let per_call = Duration::from_secs(self.config.search.source_timeout_secs);
        let deadline = Duration::from_secs(self.config.search.search_deadline_secs);
        let semaphore = Arc::new(Semaphore::new(self.config.search.max_concurrent_sources));
        let context = SearchContext {
            timeout: per_call,
            ..SearchContext::default()
        };

        let descriptors: HashMap<String, SourceDescriptor> = selected
            .iter()
            .map(|adapter| (adapter.name().to_string(), adapter.descriptor()))
            .collect();

        let mut sources_queried: Vec<String> = Vec::new();
        let mut source_status: BTreeMap<String, SourceStatus> = BTreeMap::new();
        let mut tasks: JoinSet<AdapterOutcome> = JoinSet::new();

        for adapter in selected {
            let descriptor = adapter.descriptor();
            if descriptor.requires_credential && query.credential_for(descriptor.name).is_none() {
                warn!(
                    source = descriptor.name,
                    "skipping source: requires a credential the caller did not supply"
                );
                source_status.insert(descriptor.name.to_string(), SourceStatus::MissingCredential);
                continue;
            }

            sources_queried.push(descriptor.name.to_string());

            let adapter = Arc::clone(adapter);
            let governor = Arc::clone(&self.governor);
            let semaphore = Arc::clone(&semaphore);
            let query = query.clone();
            let context = context.clone();
            tasks.spawn(async move {
                let name = adapter.name().to_string();
                // The permit covers governor wait plus the call itself, so
                // the in-flight bound counts whole source slots
                let Ok(_permit) = semaphore.acquire().await else {
                    return (
                        name,
                        Err(AdapterError::Network("dispatch pool closed".to_string())),
                    );
                };
                governor.acquire(&name).await;
                debug!(source = %name, "dispatching source call");
                let outcome = tokio::time::timeout(context.timeout, adapter.search(&query, &context))
                    .await
                    .unwrap_or(Err(AdapterError::Timeout));
                (name, outcome)
            });
        }

        let mut collected: Vec<NormalizedPaper> = Vec::new();

        let collect = async {
            while let Some(joined) = tasks.join_next().await {
                Self::record_outcome(
                    joined,
                    query,
                    &descriptors,
                    &mut collected,
                    &mut source_status,
                );
            }
        };
        let deadline_hit = tokio::time::timeout(deadline, collect).await.is_err();

        if deadline_hit {
            warn!(?deadline, "search deadline elapsed, aborting outstanding source calls");
            tasks.abort_all();
            // Reap everything: results that finished in the race window
            // still count, aborted tasks surface as cancelled joins
            while let Some(joined) = tasks.join_next().await {
                Self::record_outcome(
                    joined,
                    query,
                    &descriptors,
                    &mut collected,
                    &mut source_status,
                );
            }
        }

        // Aborted (or panicked) tasks never reported a status themselves
        for name in &sources_queried {
            source_status.entry(name.clone()).or_insert_with(|| {
                if deadline_hit {
                    SourceStatus::TimedOut
                } else {
                    SourceStatus::Error("task failed".to_string())
                }
            });
        }

        // A deadline with nothing usable lands here too: the stragglers
        // are all timed-out, so the detail says exactly that
        if !source_status.values().any(SourceStatus::is_ok) {
            let detail = source_status
                .iter()
                .map(|(name, status)| format!("{name}: {status}"))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(Error::AllSourcesFailed { detail });
        }

        let mut papers = deduplicate(collected, &self.config.sources.priority);
        rank(&mut papers, query);

        info!(
            results = papers.len(),
            sources = sources_queried.len(),
            deadline_hit,
            "search merged"
        );

        Ok(AggregatedResultSet {
            papers,
            sources_queried,
            source_status,
        })
    }

    /// Folds one finished adapter task into the collection state: sanitize
    /// every record, apply the post-filters the adapter could not express
    /// natively, and record the source outcome. `ok` vs `empty` reflects
    /// what the source contributed after sanitization and filtering.
    fn record_outcome(
        joined: std::result::Result<AdapterOutcome, tokio::task::JoinError>,
        query: &SearchQuery,
        descriptors: &HashMap<String, SourceDescriptor>,
        collected: &mut Vec<NormalizedPaper>,
        source_status: &mut BTreeMap<String, SourceStatus>,
    ) {
        let (name, outcome) = match joined {
            Ok(pair) => pair,
            Err(join_err) => {
                if !join_err.is_cancelled() {
                    warn!(error = %join_err, "source task failed to complete");
                }
                return;
            }
        };

        match outcome {
            Ok(papers) => {
                let received = papers.len();
                let papers: Vec<NormalizedPaper> =
                    papers.into_iter().filter_map(sanitize_paper).collect();
                let papers = match descriptors.get(&name) {
                    Some(descriptor) => apply_post_filters(papers, query, descriptor),
                    None => papers,
                };
                debug!(source = %name, received, kept = papers.len(), "source answered");
                let status = if papers.is_empty() {
                    SourceStatus::Empty
                } else {
                    SourceStatus::Ok
                };
                source_status.insert(name, status);
                collected.extend(papers);
            }
            Err(err) => {
                warn!(source = %name, error = %err, "source degraded");
                source_status.insert(name, SourceStatus::from(&err));
            }
        }
    }

    /// Slices the requested page out of a merged set. An out-of-range page
    /// yields an empty page with the correct total.
    fn paginate(set: &AggregatedResultSet, query: &SearchQuery) -> SearchResponse {
        let start = (query.page as usize).saturating_mul(query.per_page as usize);
        let papers: Vec<NormalizedPaper> = set
            .papers
            .iter()
            .skip(start)
            .take(query.per_page as usize)
            .cloned()
            .collect();

        SearchResponse {
            total_results: set.papers.len(),
            papers,
            sources_queried: set.sources_queried.clone(),
            source_status: set.source_status.clone(),
        }
    }
}

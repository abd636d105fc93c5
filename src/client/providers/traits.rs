//! # Provider Traits Module
//!
//! Core traits and types for academic source adapters. Every external
//! provider — bibliographic API, open repository, or scraped index — is
//! wrapped in one [`SourceAdapter`] implementation that translates the
//! canonical [`SearchQuery`] into its own dialect, executes the call, and
//! parses the response into [`NormalizedPaper`] records.
//!
//! ## Key Components
//!
//! - [`SourceAdapter`]: trait all adapters implement
//! - [`SearchQuery`]: canonical search request
//! - [`SourceDescriptor`]: static per-adapter capability metadata
//! - [`AdapterError`]: per-source failure classification
//! - [`SourceStatus`]: per-source outcome reported on every response
//!
//! ## Adapter Implementation Guide
//!
//! ```no_run
//! use async_trait::async_trait;
//! use paper_search_engine::client::NormalizedPaper;
//! use paper_search_engine::client::providers::{
//!     AdapterError, SearchContext, SearchQuery, SourceAdapter, SourceDescriptor,
//! };
//! use std::time::Duration;
//!
//! struct MyAdapter {
//!     client: reqwest::Client,
//!     base_url: String,
//! }
//!
//! #[async_trait]
//! impl SourceAdapter for MyAdapter {
//!     fn name(&self) -> &'static str {
//!         "my_source"
//!     }
//!
//!     fn descriptor(&self) -> SourceDescriptor {
//!         SourceDescriptor {
//!             name: "my_source",
//!             description: "Example provider",
//!             query_syntax: "plain keywords",
//!             requires_credential: false,
//!             min_interval: Duration::from_millis(500),
//!             max_results: 25,
//!             native: &[],
//!         }
//!     }
//!
//!     async fn search(
//!         &self,
//!         query: &SearchQuery,
//!         context: &SearchContext,
//!     ) -> Result<Vec<NormalizedPaper>, AdapterError> {
//!         let url = format!("{}/search?q={}", self.base_url, urlencoding::encode(&query.query));
//!         let response = self
//!             .client
//!             .get(&url)
//!             .timeout(context.timeout)
//!             .send()
//!             .await
//!             .map_err(|e| AdapterError::Network(e.to_string()))?;
//!         if !response.status().is_success() {
//!             return Err(AdapterError::Http(response.status().as_u16()));
//!         }
//!         Ok(vec![])
//!     }
//! }
//! ```

use crate::client::NormalizedPaper;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Canonical search request accepted by the aggregation engine.
///
/// Constructed per request and never mutated. Adapters read the fields
/// their provider can express (see [`SourceDescriptor::native`]); the rest
/// are applied as post-filters or dropped.
#[derive(Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchQuery {
    /// Free-text query string
    pub query: String,
    /// Earliest publication year, inclusive
    pub year_start: Option<u16>,
    /// Latest publication year, inclusive
    pub year_end: Option<u16>,
    /// Subject area, provider vocabulary permitting
    pub discipline: Option<String>,
    /// Education level facet (e.g. "higher education")
    pub education_level: Option<String>,
    /// Publication type facet (e.g. "journal article")
    pub publication_type: Option<String>,
    /// Study type facet (e.g. "randomized controlled trial")
    pub study_type: Option<String>,
    /// Minimum citation count
    pub min_citations: Option<u32>,
    /// Sort order for the merged result set
    #[serde(default)]
    pub sort_by: SortBy,
    /// Result page, 0-based
    #[serde(default)]
    pub page: u32,
    /// Page size, bounded by configuration
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    /// Explicit subset of adapters to query; `None` means all enabled
    pub sources: Option<Vec<String>>,
    /// Per-adapter API keys supplied by the caller, never persisted
    #[serde(default, skip_serializing)]
    pub credentials: HashMap<String, String>,
}

fn default_per_page() -> u32 {
    20
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            query: String::new(),
            year_start: None,
            year_end: None,
            discipline: None,
            education_level: None,
            publication_type: None,
            study_type: None,
            min_citations: None,
            sort_by: SortBy::default(),
            page: 0,
            per_page: default_per_page(),
            sources: None,
            credentials: HashMap::new(),
        }
    }
}

impl std::fmt::Debug for SearchQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchQuery")
            .field("query", &self.query)
            .field("year_start", &self.year_start)
            .field("year_end", &self.year_end)
            .field("discipline", &self.discipline)
            .field("education_level", &self.education_level)
            .field("publication_type", &self.publication_type)
            .field("study_type", &self.study_type)
            .field("min_citations", &self.min_citations)
            .field("sort_by", &self.sort_by)
            .field("page", &self.page)
            .field("per_page", &self.per_page)
            .field("sources", &self.sources)
            .field("credentials", &format!("<{} redacted>", self.credentials.len()))
            .finish()
    }
}

impl SearchQuery {
    /// Credential for the named adapter, if the caller supplied one.
    #[must_use]
    pub fn credential_for(&self, source: &str) -> Option<&str> {
        self.credentials.get(source).map(String::as_str)
    }

    /// Whether the query text is a bare DOI, i.e. a single-paper lookup
    /// rather than a broad search. Cache TTL selection keys off this.
    #[must_use]
    pub fn is_doi_lookup(&self) -> bool {
        crate::client::Doi::new(self.query.trim()).is_ok()
    }
}

/// Sort criterion for the merged result set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    /// Query-term relevance score, descending
    #[default]
    Relevance,
    /// Publication year, newest first; undated records last
    Newest,
    /// Publication year, oldest first; undated records last
    Oldest,
    /// Citation count, descending; missing counts as zero
    Citations,
}

impl std::str::FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "relevance" => Ok(Self::Relevance),
            "newest" => Ok(Self::Newest),
            "oldest" => Ok(Self::Oldest),
            "citations" => Ok(Self::Citations),
            other => Err(format!(
                "unknown sort order '{other}' (expected relevance, newest, oldest, or citations)"
            )),
        }
    }
}

impl std::fmt::Display for SortBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Relevance => "relevance",
            Self::Newest => "newest",
            Self::Oldest => "oldest",
            Self::Citations => "citations",
        };
        write!(f, "{s}")
    }
}

/// Context for one adapter call.
#[derive(Debug, Clone)]
pub struct SearchContext {
    /// Timeout for the whole call (request + parse)
    pub timeout: Duration,
    /// User agent string adapters send upstream
    pub user_agent: String,
}

impl Default for SearchContext {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: "paper-search-engine/0.1.0 (Academic Search Aggregator)".to_string(),
        }
    }
}

/// SearchQuery fields an adapter can push into its provider's own query
/// dialect. Anything not listed is handled by shared post-filtering (year
/// range, citation floor) or dropped (vocabulary facets the provider has
/// no field for).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryCapability {
    /// `year_start`/`year_end`
    YearRange,
    /// `discipline`
    Discipline,
    /// `education_level`
    EducationLevel,
    /// `publication_type`
    PublicationType,
    /// `study_type`
    StudyType,
    /// `min_citations`
    MinCitations,
}

/// Static metadata describing one adapter.
#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    /// Unique lowercase identifier, also the `source` value on results
    pub name: &'static str,
    /// One-line human description
    pub description: &'static str,
    /// Name of the provider's native query dialect
    pub query_syntax: &'static str,
    /// Whether calls are impossible without a caller-supplied credential
    pub requires_credential: bool,
    /// Minimum spacing between calls to this provider, process-wide
    pub min_interval: Duration,
    /// Most records one call will request
    pub max_results: u32,
    /// Query fields expressible in the provider's own dialect
    pub native: &'static [QueryCapability],
}

impl SourceDescriptor {
    /// Whether the adapter expresses this query field natively.
    #[must_use]
    pub fn supports(&self, capability: QueryCapability) -> bool {
        self.native.contains(&capability)
    }
}

/// Errors from one adapter call. All of these degrade the adapter's
/// contribution to empty with a recorded [`SourceStatus`]; none of them
/// fail the overall search.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP status {0}")]
    Http(u16),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Timeout occurred")]
    Timeout,

    #[error("Credential required but not supplied")]
    MissingCredential,
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if let Some(status) = err.status() {
            if status.as_u16() == 429 {
                Self::RateLimit
            } else {
                Self::Http(status.as_u16())
            }
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else if err.is_connect() {
            Self::Network(format!("connection failed: {err}"))
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Per-adapter outcome reported in `source_status` on every response.
///
/// Serializes as a plain string (`"ok"`, `"timed-out"`,
/// `"error: HTTP 500"`, ...) so the response map stays
/// `map<string, string>` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SourceStatus {
    /// Call succeeded with at least one record
    Ok,
    /// Call succeeded with zero records
    Empty,
    /// Per-call timeout or the overall search deadline cut the call off
    TimedOut,
    /// Provider signalled throttling (HTTP 429 or equivalent)
    RateLimited,
    /// Adapter requires a credential the caller did not supply
    MissingCredential,
    /// Any other failure, with reason
    Error(String),
}

impl SourceStatus {
    /// `ok` and `empty` both mean the adapter answered.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok | Self::Empty)
    }
}

impl From<&AdapterError> for SourceStatus {
    fn from(err: &AdapterError) -> Self {
        match err {
            AdapterError::Timeout => Self::TimedOut,
            AdapterError::RateLimit => Self::RateLimited,
            AdapterError::MissingCredential => Self::MissingCredential,
            AdapterError::Http(status) => Self::Error(format!("HTTP {status}")),
            AdapterError::Parse(msg) => Self::Error(format!("malformed response: {msg}")),
            AdapterError::Network(msg) => Self::Error(format!("network: {msg}")),
        }
    }
}

impl From<SourceStatus> for String {
    fn from(status: SourceStatus) -> Self {
        status.to_string()
    }
}

impl From<String> for SourceStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "ok" => Self::Ok,
            "empty" => Self::Empty,
            "timed-out" => Self::TimedOut,
            "rate-limited" => Self::RateLimited,
            "missing-credential" => Self::MissingCredential,
            other => Self::Error(
                other
                    .strip_prefix("error: ")
                    .unwrap_or(other)
                    .to_string(),
            ),
        }
    }
}

impl std::fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Empty => write!(f, "empty"),
            Self::TimedOut => write!(f, "timed-out"),
            Self::RateLimited => write!(f, "rate-limited"),
            Self::MissingCredential => write!(f, "missing-credential"),
            Self::Error(reason) => write!(f, "error: {reason}"),
        }
    }
}

/// Core trait for academic source adapters.
///
/// Implementors must be thread-safe (`Send + Sync`), map provider failures
/// to [`AdapterError`] variants instead of panicking, and keep every piece
/// of provider-specific query syntax inside their own module — the
/// aggregation core never sees a provider dialect.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Unique lowercase identifier, matching `descriptor().name`.
    fn name(&self) -> &'static str;

    /// Static capability metadata for this adapter.
    fn descriptor(&self) -> SourceDescriptor;

    /// Performs one search call and maps the provider response into
    /// canonical records.
    ///
    /// Pagination is not the adapter's concern: each call requests up to
    /// `descriptor().max_results` records and the merged set is paginated
    /// downstream. Credentials arrive on the query; an adapter whose
    /// descriptor sets `requires_credential` never reaches this method
    /// without one.
    async fn search(
        &self,
        query: &SearchQuery,
        context: &SearchContext,
    ) -> Result<Vec<NormalizedPaper>, AdapterError>;

    /// Lightweight availability probe.
    ///
    /// Default implementation runs a minimal search; a rate-limit response
    /// still counts as available.
    async fn health_check(&self, context: &SearchContext) -> Result<bool, AdapterError> {
        let query = SearchQuery {
            query: "education".to_string(),
            ..SearchQuery::default()
        };

        match self.search(&query, context).await {
            Ok(_) => Ok(true),
            Err(AdapterError::RateLimit) => Ok(true),
            Err(_) => Ok(false),
        }
    }
}

/// Applies query constraints the adapter could not express natively.
///
/// Year bounds drop records whose year is outside the range, including
/// undated (`"n.d."`) records when either bound is set. A citation floor
/// treats a missing count as zero. Vocabulary facets (discipline,
/// education level, publication type, study type) are never post-filtered:
/// providers without a matching field simply cannot constrain on them.
#[must_use]
pub fn apply_post_filters(
    papers: Vec<NormalizedPaper>,
    query: &SearchQuery,
    descriptor: &SourceDescriptor,
) -> Vec<NormalizedPaper> {
    let filter_years = (query.year_start.is_some() || query.year_end.is_some())
        && !descriptor.supports(QueryCapability::YearRange);
    let filter_citations =
        query.min_citations.is_some() && !descriptor.supports(QueryCapability::MinCitations);

    if !filter_years && !filter_citations {
        return papers;
    }

    papers
        .into_iter()
        .filter(|paper| {
            if filter_years {
                let Some(year) = paper.year_number() else {
                    return false;
                };
                if let Some(start) = query.year_start {
                    if year < start {
                        return false;
                    }
                }
                if let Some(end) = query.year_end {
                    if year > end {
                        return false;
                    }
                }
            }
            if filter_citations {
                let floor = query.min_citations.unwrap_or(0);
                if paper.citation_count.unwrap_or(0) < floor {
                    return false;
                }
            }
            true
        })
        .collect()
}

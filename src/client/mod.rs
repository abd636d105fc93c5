//! # Client Module
//!
//! Core client infrastructure for federated academic paper search. One
//! canonical query fans out concurrently to every enabled source adapter;
//! partial failures degrade per-source instead of failing the search, and
//! the merged result set is deduplicated, ranked, and cached as a whole.
//!
//! ## Architecture
//!
//! - **Aggregation layer**: [`Aggregator`] owns the request lifecycle from
//!   cache check through fan-out to pagination
//! - **Adapter layer**: one module per external provider under [`providers`],
//!   each owning its own query dialect and response schema
//! - **Throttling**: [`RateGovernor`] enforces per-source minimum call
//!   intervals across all concurrent searches
//!
//! ## Example Usage
//!
//! ```no_run
//! use paper_search_engine::client::Aggregator;
//! use paper_search_engine::client::providers::SearchQuery;
//! use paper_search_engine::Config;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(Config::default());
//! let aggregator = Aggregator::new(config)?;
//!
//! let query = SearchQuery {
//!     query: "machine learning education".to_string(),
//!     year_start: Some(2020),
//!     year_end: Some(2024),
//!     ..SearchQuery::default()
//! };
//!
//! let response = aggregator.search(&query).await?;
//! println!("{} papers from {:?}", response.total_results, response.sources_queried);
//! # Ok(())
//! # }
//! ```
//!
//! ## Security Considerations
//!
//! All HTTP clients enforce HTTPS, certificate validation, timeouts, and
//! connection pooling. Plain HTTP is permitted only when a configured
//! endpoint override requests it (local mocks, self-hosted mirrors).

pub mod aggregator;
pub mod providers;
pub mod rate_governor;

pub use aggregator::{AggregatedResultSet, Aggregator, SearchResponse};
pub use rate_governor::RateGovernor;

use crate::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP client configuration shared by all source adapters
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout duration
    pub timeout: Duration,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Maximum redirects to follow
    pub max_redirects: u32,
    /// User agent string
    pub user_agent: String,
    /// Permit plain-HTTP endpoints (endpoint overrides only)
    pub allow_http: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_redirects: 5,
            user_agent: "paper-search-engine/0.1.0 (Academic Search Aggregator)".to_string(),
            allow_http: false,
        }
    }
}

/// Factory for creating HTTP clients with enforced security defaults.
///
/// Every adapter call goes through a client built here: HTTPS-only (unless
/// an endpoint override opted into HTTP), certificate validation, request
/// and connect timeouts, bounded redirects, and connection pooling.
pub struct SecureHttpClientFactory;

impl SecureHttpClientFactory {
    /// Creates an HTTP client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if TLS setup or client construction fails.
    pub fn create_client(config: &HttpClientConfig) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .redirect(reqwest::redirect::Policy::limited(
                config.max_redirects as usize,
            ))
            .user_agent(&config.user_agent)
            .tls_built_in_root_certs(true)
            .https_only(!config.allow_http)
            .connection_verbose(false)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(crate::Error::Http)
    }

    /// Create an HTTP client with default configuration
    pub fn create_default_client() -> Result<reqwest::Client> {
        Self::create_client(&HttpClientConfig::default())
    }
}

/// DOI (Digital Object Identifier) wrapper for type safety
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Doi(String);

impl Doi {
    /// Create a new DOI from a string, stripping common prefixes and
    /// lower-casing per the canonical form.
    pub fn new(doi: &str) -> Result<Self> {
        let cleaned = doi
            .trim()
            .trim_start_matches("doi:")
            .trim_start_matches("https://doi.org/")
            .trim_start_matches("http://doi.org/")
            .trim_start_matches("https://dx.doi.org/")
            .trim_start_matches("http://dx.doi.org/")
            .to_lowercase();

        if cleaned.is_empty() {
            return Err(crate::Error::InvalidInput {
                field: "doi".to_string(),
                reason: "DOI cannot be empty".to_string(),
            });
        }

        // Registrant prefix and suffix separated by '/'
        if !cleaned.starts_with("10.") || !cleaned.contains('/') {
            return Err(crate::Error::InvalidInput {
                field: "doi".to_string(),
                reason: format!("'{cleaned}' is not a valid DOI"),
            });
        }

        Ok(Self(cleaned))
    }

    /// Get the DOI string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to a URL-safe format
    #[must_use]
    pub fn url_encoded(&self) -> String {
        urlencoding::encode(&self.0).to_string()
    }
}

impl std::fmt::Display for Doi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Doi {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// Canonical paper record produced by the adapter layer.
///
/// Every provider response, whatever its native schema, is mapped into this
/// shape before it reaches deduplication or ranking. Fields are already
/// sanitized: free text is HTML-stripped and length-capped, the DOI is
/// lower-cased with any URL prefix removed, and `year` is either a 4-digit
/// string or `"n.d."`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NormalizedPaper {
    /// Paper title (always present; records without one are dropped)
    pub title: String,
    /// Authors in the order the source lists them
    #[serde(default)]
    pub authors: Vec<String>,
    /// Abstract text
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    /// Publication year as a string, `"n.d."` when the source has none
    pub year: String,
    /// Name of the adapter this record (or the dedup winner) came from
    pub source: String,
    /// Digital Object Identifier, canonical lower-case form
    pub doi: Option<String>,
    /// Link to full text when the source exposes one
    pub full_text_url: Option<String>,
    /// Journal or venue name
    pub journal: Option<String>,
    /// Citation count when the source tracks citations
    pub citation_count: Option<u32>,
    /// Sources that contributed to this record after deduplication,
    /// winner first
    #[serde(default)]
    pub merged_from: Vec<String>,
}

/// Year string used when a source provides no publication date.
pub const YEAR_UNKNOWN: &str = "n.d.";

impl NormalizedPaper {
    /// Create a record with the required fields; everything else empty.
    #[must_use]
    pub fn new(title: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            authors: Vec::new(),
            abstract_text: None,
            year: YEAR_UNKNOWN.to_string(),
            source: source.into(),
            doi: None,
            full_text_url: None,
            journal: None,
            citation_count: None,
            merged_from: Vec::new(),
        }
    }

    /// Publication year as a number, `None` for `"n.d."` or anything
    /// unparseable. Ranking and year post-filters rely on this.
    #[must_use]
    pub fn year_number(&self) -> Option<u16> {
        self.year.parse::<u16>().ok().filter(|y| *y >= 1000)
    }
}

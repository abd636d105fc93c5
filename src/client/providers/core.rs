use super::traits::{
    AdapterError, QueryCapability, SearchContext, SearchQuery, SourceAdapter, SourceDescriptor,
};
use crate::client::NormalizedPaper;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// CORE v3 search response
#[derive(Debug, Deserialize)]
struct CoreSearchResponse {
    #[serde(rename = "totalHits")]
    #[allow(dead_code)]
    total_hits: Option<u64>,
    #[serde(default)]
    results: Vec<CoreWork>,
}

#[derive(Debug, Deserialize)]
struct CoreWork {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<CoreAuthor>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(rename = "yearPublished")]
    year_published: Option<u16>,
    doi: Option<String>,
    #[serde(rename = "downloadUrl")]
    download_url: Option<String>,
    publisher: Option<String>,
    #[serde(rename = "citationCount")]
    citation_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CoreAuthor {
    name: Option<String>,
}

/// CORE aggregator adapter (api.core.ac.uk v3).
///
/// CORE takes a Lucene-style query string, so year bounds are expressed
/// as `yearPublished>=`/`<=` conjuncts on the free-text term. Every call
/// needs a caller-supplied API key sent as a Bearer token.
pub struct CoreAdapter {
    client: Client,
    base_url: String,
}

impl CoreAdapter {
    pub fn new(client: Client, base_url: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.unwrap_or_else(|| "https://api.core.ac.uk/v3".to_string()),
        }
    }

    /// Lucene conjunction of the free-text term and any year bounds.
    fn build_query_string(query: &SearchQuery) -> String {
        let mut q = format!("\"{}\"", query.query.trim().replace('"', ""));
        if let Some(start) = query.year_start {
            q.push_str(&format!(" AND yearPublished>={start}"));
        }
        if let Some(end) = query.year_end {
            q.push_str(&format!(" AND yearPublished<={end}"));
        }
        q
    }

    fn build_search_url(&self, query: &SearchQuery) -> String {
        format!(
            "{}/search/works?q={}&limit={}",
            self.base_url,
            urlencoding::encode(&Self::build_query_string(query)),
            self.descriptor().max_results,
        )
    }

    fn convert_work(work: CoreWork) -> Option<NormalizedPaper> {
        let title = work.title?;
        let mut paper = NormalizedPaper::new(title, "core");
        paper.authors = work.authors.into_iter().filter_map(|a| a.name).collect();
        paper.abstract_text = work.abstract_text;
        if let Some(year) = work.year_published {
            paper.year = year.to_string();
        }
        paper.doi = work.doi;
        paper.full_text_url = work.download_url.filter(|u| !u.is_empty());
        paper.journal = work.publisher;
        paper.citation_count = work.citation_count;
        Some(paper)
    }
}

#[async_trait]
impl SourceAdapter for CoreAdapter {
    fn name(&self) -> &'static str {
        "core"
    }

    fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor {
            name: "core",
            description: "CORE - Open access research aggregator (API key required)",
            query_syntax: "Lucene query string",
            requires_credential: true,
            min_interval: Duration::from_millis(1000),
            max_results: 50,
            native: &[QueryCapability::YearRange],
        }
    }

    async fn search(
        &self,
        query: &SearchQuery,
        context: &SearchContext,
    ) -> Result<Vec<NormalizedPaper>, AdapterError> {
        let Some(api_key) = query.credential_for("core") else {
            warn!("CORE adapter invoked without an API key");
            return Err(AdapterError::MissingCredential);
        };

        let url = self.build_search_url(query);
        debug!("CORE search URL: {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(api_key)
            .timeout(context.timeout)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(AdapterError::RateLimit);
        }
        // CORE answers 401/403 for bad keys; surface those as HTTP errors
        if !status.is_success() {
            return Err(AdapterError::Http(status.as_u16()));
        }

        let body = response.text().await?;
        let parsed: CoreSearchResponse = serde_json::from_str(&body)
            .map_err(|e| AdapterError::Parse(format!("invalid JSON: {e}")))?;

        let papers: Vec<NormalizedPaper> = parsed
            .results
            .into_iter()
            .filter_map(Self::convert_work)
            .collect();

        debug!("CORE returned {} records", papers.len());
        Ok(papers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lucene_query_includes_year_conjuncts() {
        let query = SearchQuery {
            query: "flipped classroom".to_string(),
            year_start: Some(2018),
            year_end: Some(2022),
            ..SearchQuery::default()
        };

        let q = CoreAdapter::build_query_string(&query);
        assert_eq!(
            q,
            "\"flipped classroom\" AND yearPublished>=2018 AND yearPublished<=2022"
        );
    }

    #[test]
    fn test_embedded_quotes_are_stripped() {
        let query = SearchQuery {
            query: "\"exact phrase\"".to_string(),
            ..SearchQuery::default()
        };
        assert_eq!(CoreAdapter::build_query_string(&query), "\"exact phrase\"");
    }

    #[test]
    fn test_search_url_page_size_matches_descriptor() {
        let adapter = CoreAdapter::new(Client::new(), None);
        let query = SearchQuery {
            query: "open science".to_string(),
            ..SearchQuery::default()
        };
        let url = adapter.build_search_url(&query);
        assert!(url.ends_with(&format!("&limit={}", adapter.descriptor().max_results)));
    }

    #[tokio::test]
    async fn test_missing_credential_short_circuits() {
        let adapter = CoreAdapter::new(Client::new(), None);
        let query = SearchQuery {
            query: "learning analytics".to_string(),
            ..SearchQuery::default()
        };

        let result = adapter.search(&query, &SearchContext::default()).await;
        assert!(matches!(result, Err(AdapterError::MissingCredential)));
    }

    #[test]
    fn test_parse_and_convert() {
        let body = r#"{
            "totalHits": 4102,
            "results": [{
                "title": "Peer Instruction at Scale",
                "authors": [{"name": "Novak, Erik"}, {"name": "Ruiz, Carla"}],
                "abstract": "A multi-institution study of peer instruction.",
                "yearPublished": 2020,
                "doi": "10.5281/zenodo.1234567",
                "downloadUrl": "https://core.ac.uk/download/123456.pdf",
                "publisher": "Zenodo",
                "citationCount": 18
            }]
        }"#;

        let parsed: CoreSearchResponse = serde_json::from_str(body).unwrap();
        let papers: Vec<NormalizedPaper> = parsed
            .results
            .into_iter()
            .filter_map(CoreAdapter::convert_work)
            .collect();

        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].citation_count, Some(18));
        assert_eq!(papers[0].doi.as_deref(), Some("10.5281/zenodo.1234567"));
        assert_eq!(papers[0].authors.len(), 2);
    }
}

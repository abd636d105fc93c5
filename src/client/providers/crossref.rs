use super::traits::{
    AdapterError, QueryCapability, SearchContext, SearchQuery, SourceAdapter, SourceDescriptor,
};
use crate::client::NormalizedPaper;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// `Crossref` API response structures
#[derive(Debug, Deserialize)]
struct CrossrefResponse {
    status: String,
    message: CrossrefMessage,
}

#[derive(Debug, Deserialize)]
struct CrossrefMessage {
    #[serde(default)]
    items: Vec<CrossrefWork>,
    #[serde(rename = "total-results")]
    total_results: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct CrossrefWork {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    title: Option<Vec<String>>,
    author: Option<Vec<CrossrefAuthor>>,
    #[serde(rename = "container-title")]
    container_title: Option<Vec<String>>,
    published: Option<CrossrefDate>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(rename = "URL")]
    url: Option<String>,
    #[serde(rename = "is-referenced-by-count")]
    referenced_by: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CrossrefAuthor {
    given: Option<String>,
    family: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrossrefDate {
    #[serde(rename = "date-parts")]
    date_parts: Option<Vec<Vec<u32>>>,
}

/// Crossref works adapter.
///
/// Structured constraints travel in the `filter` parameter
/// (`from-pub-date`, `until-pub-date`, `type`) next to the free-text
/// `query` term.
pub struct CrossrefAdapter {
    client: Client,
    base_url: String,
}

impl CrossrefAdapter {
    pub fn new(client: Client, base_url: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.unwrap_or_else(|| "https://api.crossref.org".to_string()),
        }
    }

    /// Crossref work types are lowercase hyphenated slugs
    /// ("journal-article", "book-chapter").
    fn type_slug(publication_type: &str) -> String {
        publication_type.trim().to_lowercase().replace(' ', "-")
    }

    fn build_search_url(&self, query: &SearchQuery) -> Result<String, AdapterError> {
        let mut url = Url::parse(&format!("{}/works", self.base_url))
            .map_err(|e| AdapterError::Parse(format!("invalid base URL: {e}")))?;

        let mut filters: Vec<String> = Vec::new();
        if let Some(start) = query.year_start {
            filters.push(format!("from-pub-date:{start}-01-01"));
        }
        if let Some(end) = query.year_end {
            filters.push(format!("until-pub-date:{end}-12-31"));
        }
        if let Some(ptype) = &query.publication_type {
            filters.push(format!("type:{}", Self::type_slug(ptype)));
        }

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", query.query.trim());
            pairs.append_pair("rows", &self.descriptor().max_results.to_string());
            pairs.append_pair(
                "select",
                "DOI,title,author,container-title,published,abstract,URL,is-referenced-by-count",
            );
            if !filters.is_empty() {
                pairs.append_pair("filter", &filters.join(","));
            }
        }

        Ok(url.to_string())
    }

    fn convert_work(work: CrossrefWork) -> Option<NormalizedPaper> {
        let title = work
            .title
            .and_then(|titles| titles.into_iter().next())
            .map(|title| title.trim().to_string())?;

        let mut paper = NormalizedPaper::new(title, "crossref");
        paper.authors = work
            .author
            .unwrap_or_default()
            .into_iter()
            .filter_map(|author| match (author.given, author.family) {
                (Some(given), Some(family)) => Some(format!("{given} {family}")),
                (None, Some(family)) => Some(family),
                (Some(given), None) => Some(given),
                (None, None) => None,
            })
            .collect();
        paper.abstract_text = work.abstract_text;
        if let Some(year) = work
            .published
            .and_then(|date| date.date_parts)
            .and_then(|parts| parts.into_iter().next())
            .and_then(|part| part.into_iter().next())
        {
            paper.year = year.to_string();
        }
        paper.doi = work.doi;
        paper.full_text_url = work.url.filter(|u| !u.is_empty());
        paper.journal = work
            .container_title
            .and_then(|titles| titles.into_iter().next());
        paper.citation_count = work.referenced_by;
        Some(paper)
    }
}

#[async_trait]
impl SourceAdapter for CrossrefAdapter {
    fn name(&self) -> &'static str {
        "crossref"
    }

    fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor {
            name: "crossref",
            description: "Crossref - DOI registration agency metadata",
            query_syntax: "query + filter parameters",
            requires_credential: false,
            min_interval: Duration::from_millis(1000),
            max_results: 30,
            native: &[QueryCapability::YearRange, QueryCapability::PublicationType],
        }
    }

    async fn search(
        &self,
        query: &SearchQuery,
        context: &SearchContext,
    ) -> Result<Vec<NormalizedPaper>, AdapterError> {
        let url = self.build_search_url(query)?;
        debug!("Crossref search URL: {}", url);

        let response = self
            .client
            .get(&url)
            .timeout(context.timeout)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(AdapterError::RateLimit);
        }
        if !status.is_success() {
            return Err(AdapterError::Http(status.as_u16()));
        }

        let body = response.text().await?;
        let parsed: CrossrefResponse = serde_json::from_str(&body)
            .map_err(|e| AdapterError::Parse(format!("invalid JSON: {e}")))?;

        if parsed.status != "ok" {
            return Err(AdapterError::Parse(format!(
                "Crossref reported status '{}'",
                parsed.status
            )));
        }

        let total = parsed.message.total_results.unwrap_or(0);
        let papers: Vec<NormalizedPaper> = parsed
            .message
            .items
            .into_iter()
            .filter_map(Self::convert_work)
            .collect();

        info!(
            "Crossref returned {} of {} matching works",
            papers.len(),
            total
        );
        Ok(papers)
    }
}

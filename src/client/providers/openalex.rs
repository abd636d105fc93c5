use super::traits::{
    AdapterError, QueryCapability, SearchContext, SearchQuery, SourceAdapter, SourceDescriptor,
};
use crate::client::NormalizedPaper;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use url::Url;

#[derive(Debug, Deserialize)]
struct OpenAlexResponse {
    #[serde(default)]
    results: Vec<OpenAlexWork>,
}

#[derive(Debug, Deserialize)]
struct OpenAlexWork {
    id: Option<String>,
    doi: Option<String>,
    title: Option<String>,
    #[serde(default)]
    authorships: Vec<Authorship>,
    publication_year: Option<u16>,
    primary_location: Option<Location>,
    best_oa_location: Option<Location>,
    cited_by_count: Option<u32>,
    /// OpenAlex ships abstracts as word -> positions to sidestep
    /// publisher licensing; the full text is reassembled client-side
    abstract_inverted_index: Option<HashMap<String, Vec<u32>>>,
}

#[derive(Debug, Deserialize)]
struct Authorship {
    author: Author,
}

#[derive(Debug, Deserialize)]
struct Author {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Location {
    source: Option<LocationSource>,
    pdf_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LocationSource {
    display_name: Option<String>,
}

/// Index positions beyond this are treated as a corrupt payload rather
/// than sized into the reconstruction buffer.
const MAX_ABSTRACT_WORDS: usize = 10_000;

/// OpenAlex works adapter.
///
/// Constraints are pushed through the `filter` parameter
/// (`publication_year:YYYY-YYYY`, `cited_by_count:>N`) next to the
/// full-text `search` term.
pub struct OpenAlexAdapter {
    client: Client,
    base_url: String,
}

impl OpenAlexAdapter {
    pub fn new(client: Client, base_url: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.unwrap_or_else(|| "https://api.openalex.org".to_string()),
        }
    }

    fn build_search_url(&self, query: &SearchQuery) -> Result<String, AdapterError> {
        let mut url = Url::parse(&format!("{}/works", self.base_url))
            .map_err(|e| AdapterError::Parse(format!("invalid base URL: {e}")))?;

        let mut filters: Vec<String> = Vec::new();
        match (query.year_start, query.year_end) {
            (Some(start), Some(end)) => filters.push(format!("publication_year:{start}-{end}")),
            (Some(start), None) => {
                filters.push(format!("publication_year:>{}", start.saturating_sub(1)));
            }
            (None, Some(end)) => {
                filters.push(format!("publication_year:<{}", end.saturating_add(1)));
            }
            (None, None) => {}
        }
        if let Some(floor) = query.min_citations {
            if floor > 0 {
                filters.push(format!("cited_by_count:>{}", floor - 1));
            }
        }

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("search", query.query.trim());
            pairs.append_pair("per-page", &self.descriptor().max_results.to_string());
            pairs.append_pair(
                "select",
                "id,doi,title,authorships,publication_year,primary_location,best_oa_location,cited_by_count,abstract_inverted_index",
            );
            if !filters.is_empty() {
                pairs.append_pair("filter", &filters.join(","));
            }
        }

        Ok(url.to_string())
    }

    /// Rebuild the abstract from OpenAlex's inverted index.
    fn reconstruct_abstract(index: Option<&HashMap<String, Vec<u32>>>) -> Option<String> {
        let index = index?;
        if index.is_empty() {
            return None;
        }

        let max_position = index
            .values()
            .flat_map(|positions| positions.iter())
            .max()
            .copied()? as usize;
        if max_position > MAX_ABSTRACT_WORDS {
            return None;
        }

        let mut words: Vec<Option<&str>> = vec![None; max_position + 1];
        for (word, positions) in index {
            for &pos in positions {
                if let Some(slot) = words.get_mut(pos as usize) {
                    *slot = Some(word.as_str());
                }
            }
        }

        let text: String = words.into_iter().flatten().collect::<Vec<&str>>().join(" ");
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    fn convert_work(work: OpenAlexWork) -> Option<NormalizedPaper> {
        let title = work.title.clone()?;

        let mut paper = NormalizedPaper::new(title, "openalex");
        paper.authors = work
            .authorships
            .iter()
            .filter_map(|authorship| authorship.author.display_name.clone())
            .collect();
        paper.abstract_text = Self::reconstruct_abstract(work.abstract_inverted_index.as_ref());
        if let Some(year) = work.publication_year {
            paper.year = year.to_string();
        }
        // OpenAlex returns the DOI as a full https://doi.org/ URL
        paper.doi = work.doi;
        paper.full_text_url = work
            .best_oa_location
            .as_ref()
            .and_then(|loc| loc.pdf_url.clone())
            .filter(|u| !u.is_empty())
            .or(work.id);
        paper.journal = work
            .primary_location
            .and_then(|loc| loc.source)
            .and_then(|src| src.display_name);
        paper.citation_count = work.cited_by_count;
        Some(paper)
    }
}

#[async_trait]
impl SourceAdapter for OpenAlexAdapter {
    fn name(&self) -> &'static str {
        "openalex"
    }

    fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor {
            name: "openalex",
            description: "OpenAlex - Open catalog of scholarly works",
            query_syntax: "search + filter parameters",
            requires_credential: false,
            min_interval: Duration::from_millis(250),
            max_results: 50,
            native: &[QueryCapability::YearRange, QueryCapability::MinCitations],
        }
    }

    async fn search(
        &self,
        query: &SearchQuery,
        context: &SearchContext,
    ) -> Result<Vec<NormalizedPaper>, AdapterError> {
        let url = self.build_search_url(query)?;
        debug!("OpenAlex search URL: {}", url);

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
        let parsed: OpenAlexResponse = serde_json::from_str(&body)
            .map_err(|e| AdapterError::Parse(format!("invalid JSON: {e}")))?;

        let papers: Vec<NormalizedPaper> = parsed
            .results
            .into_iter()
            .filter_map(Self::convert_work)
            .collect();

        debug!("OpenAlex returned {} records", papers.len());
        Ok(papers)
    }
}

use super::traits::{
    AdapterError, QueryCapability, SearchContext, SearchQuery, SourceAdapter, SourceDescriptor,
};
use crate::client::NormalizedPaper;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Semantic Scholar Graph API response for paper search
#[derive(Debug, Deserialize)]
struct GraphSearchResponse {
    #[serde(default)]
    data: Vec<GraphPaper>,
    #[allow(dead_code)]
    total: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct GraphPaper {
    title: Option<String>,
    #[serde(rename = "externalIds")]
    external_ids: Option<ExternalIds>,
    #[serde(default)]
    authors: Vec<GraphAuthor>,
    venue: Option<String>,
    year: Option<u16>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(rename = "openAccessPdf")]
    open_access_pdf: Option<OpenAccessPdf>,
    journal: Option<GraphJournal>,
    #[serde(rename = "citationCount")]
    citation_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ExternalIds {
    #[serde(rename = "DOI")]
    doi: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphAuthor {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAccessPdf {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphJournal {
    name: Option<String>,
}

const SEARCH_FIELDS: &str =
    "title,externalIds,authors,venue,year,abstract,openAccessPdf,journal,citationCount";

/// Semantic Scholar Graph API adapter.
///
/// Year bounds map to the `year=YYYY-YYYY` parameter and a citation
/// floor to `minCitationCount`. A caller-supplied key raises the rate
/// limit but is optional; it travels in the `x-api-key` header.
pub struct SemanticScholarAdapter {
    client: Client,
    base_url: String,
}

impl SemanticScholarAdapter {
    pub fn new(client: Client, base_url: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url
                .unwrap_or_else(|| "https://api.semanticscholar.org/graph/v1".to_string()),
        }
    }

    fn year_param(query: &SearchQuery) -> Option<String> {
        match (query.year_start, query.year_end) {
            (Some(start), Some(end)) => Some(format!("{start}-{end}")),
            (Some(start), None) => Some(format!("{start}-")),
            (None, Some(end)) => Some(format!("-{end}")),
            (None, None) => None,
        }
    }

    fn build_search_url(&self, query: &SearchQuery) -> String {
        let mut url = format!(
            "{}/paper/search?query={}&fields={}&limit={}",
            self.base_url,
            urlencoding::encode(query.query.trim()),
            urlencoding::encode(SEARCH_FIELDS),
            self.descriptor().max_results,
        );
        if let Some(year) = Self::year_param(query) {
            url.push_str(&format!("&year={year}"));
        }
        if let Some(floor) = query.min_citations {
            url.push_str(&format!("&minCitationCount={floor}"));
        }
        url
    }

    fn convert_paper(paper: GraphPaper) -> Option<NormalizedPaper> {
        let title = paper.title?;

        let mut normalized = NormalizedPaper::new(title, "semantic_scholar");
        normalized.authors = paper.authors.into_iter().filter_map(|a| a.name).collect();
        normalized.abstract_text = paper.abstract_text;
        if let Some(year) = paper.year {
            normalized.year = year.to_string();
        }
        normalized.doi = paper.external_ids.and_then(|ids| ids.doi);
        normalized.full_text_url = paper
            .open_access_pdf
            .and_then(|pdf| pdf.url)
            .filter(|u| !u.is_empty());
        normalized.journal = paper.journal.and_then(|j| j.name).or(paper.venue);
        normalized.citation_count = paper.citation_count;
        Some(normalized)
    }
}

#[async_trait]
impl SourceAdapter for SemanticScholarAdapter {
    fn name(&self) -> &'static str {
        "semantic_scholar"
    }

    fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor {
            name: "semantic_scholar",
            description: "Semantic Scholar - AI-curated academic graph",
            query_syntax: "Graph API parameters",
            requires_credential: false,
            min_interval: Duration::from_millis(1000),
            max_results: 50,
            native: &[QueryCapability::YearRange, QueryCapability::MinCitations],
        }
    }

    async fn search(
        &self,
        query: &SearchQuery,
        context: &SearchContext,
    ) -> Result<Vec<NormalizedPaper>, AdapterError> {
        let url = self.build_search_url(query);
        debug!("Semantic Scholar search URL: {}", url);

        let mut request = self.client.get(&url).timeout(context.timeout);
        if let Some(api_key) = query.credential_for("semantic_scholar") {
            request = request.header("x-api-key", api_key);
        }

        let response = request.send().await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(AdapterError::RateLimit);
        }
        if !status.is_success() {
            return Err(AdapterError::Http(status.as_u16()));
        }

        let body = response.text().await?;
        let parsed: GraphSearchResponse = serde_json::from_str(&body)
            .map_err(|e| AdapterError::Parse(format!("invalid JSON: {e}")))?;

        let papers: Vec<NormalizedPaper> = parsed
            .data
            .into_iter()
            .filter_map(Self::convert_paper)
            .collect();

        debug!("Semantic Scholar returned {} records", papers.len());
        Ok(papers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> SemanticScholarAdapter {
        SemanticScholarAdapter::new(Client::new(), None)
    }

    #[test]
    fn test_search_url_carries_year_and_citation_params() {
        let query = SearchQuery {
            query: "knowledge tracing".to_string(),
            year_start: Some(2019),
            year_end: Some(2024),
            min_citations: Some(10),
            ..SearchQuery::default()
        };

        let url = adapter().build_search_url(&query);
        assert!(url.contains("query=knowledge%20tracing"));
        assert!(url.contains(&format!("&limit={}", adapter().descriptor().max_results)));
        assert!(url.contains("&year=2019-2024"));
        assert!(url.contains("&minCitationCount=10"));
    }

    #[test]
    fn test_open_ended_year_param() {
        let query = SearchQuery {
            query: "deep knowledge tracing".to_string(),
            year_start: Some(2015),
            ..SearchQuery::default()
        };
        assert!(adapter().build_search_url(&query).contains("&year=2015-"));
    }

    #[test]
    fn test_parse_and_convert() {
        let body = r#"{
            "total": 154,
            "data": [{
                "title": "Deep Knowledge Tracing",
                "externalIds": {"DOI": "10.5555/2969239.2969296", "ArXiv": "1506.05908"},
                "authors": [{"name": "Chris Piech"}, {"name": "Jonathan Bassen"}],
                "venue": "NeurIPS",
                "year": 2015,
                "abstract": "Models student knowledge over time.",
                "openAccessPdf": {"url": "https://arxiv.org/pdf/1506.05908"},
                "journal": null,
                "citationCount": 1620
            }]
        }"#;

        let parsed: GraphSearchResponse = serde_json::from_str(body).unwrap();
        let papers: Vec<NormalizedPaper> = parsed
            .data
            .into_iter()
            .filter_map(SemanticScholarAdapter::convert_paper)
            .collect();

        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].journal.as_deref(), Some("NeurIPS"));
        assert_eq!(papers[0].doi.as_deref(), Some("10.5555/2969239.2969296"));
        assert_eq!(papers[0].citation_count, Some(1620));
    }
}

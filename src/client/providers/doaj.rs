use super::traits::{
    AdapterError, QueryCapability, SearchContext, SearchQuery, SourceAdapter, SourceDescriptor,
};
use crate::client::NormalizedPaper;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct DoajResponse {
    #[allow(dead_code)]
    total: Option<u64>,
    #[serde(default)]
    results: Vec<DoajArticle>,
}

#[derive(Debug, Deserialize)]
struct DoajArticle {
    bibjson: DoajBibJson,
}

#[derive(Debug, Deserialize)]
struct DoajBibJson {
    title: Option<String>,
    #[serde(default)]
    author: Vec<DoajAuthor>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    year: Option<String>,
    #[serde(default)]
    identifier: Vec<DoajIdentifier>,
    #[serde(default)]
    link: Vec<DoajLink>,
    journal: Option<DoajJournal>,
}

#[derive(Debug, Deserialize)]
struct DoajAuthor {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DoajIdentifier {
    #[serde(rename = "type")]
    id_type: Option<String>,
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DoajLink {
    #[serde(rename = "type")]
    link_type: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DoajJournal {
    title: Option<String>,
}

/// DOAJ (Directory of Open Access Journals) adapter.
///
/// The v2 article search takes a Lucene query as a URL path segment;
/// year bounds become `bibjson.year:[YYYY TO YYYY]` range clauses.
pub struct DoajAdapter {
    client: Client,
    base_url: String,
}

impl DoajAdapter {
    pub fn new(client: Client, base_url: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.unwrap_or_else(|| "https://doaj.org/api/v2".to_string()),
        }
    }

    fn build_path_query(query: &SearchQuery) -> String {
        let mut q = query.query.trim().to_string();
        match (query.year_start, query.year_end) {
            (Some(start), Some(end)) => {
                q.push_str(&format!(" AND bibjson.year:[{start} TO {end}]"));
            }
            (Some(start), None) => {
                q.push_str(&format!(" AND bibjson.year:[{start} TO *]"));
            }
            (None, Some(end)) => {
                q.push_str(&format!(" AND bibjson.year:[* TO {end}]"));
            }
            (None, None) => {}
        }
        q
    }

    fn build_search_url(&self, query: &SearchQuery) -> String {
        format!(
            "{}/search/articles/{}?page=1&pageSize={}",
            self.base_url,
            urlencoding::encode(&Self::build_path_query(query)),
            self.descriptor().max_results,
        )
    }

    fn convert_article(article: DoajArticle) -> Option<NormalizedPaper> {
        let bib = article.bibjson;
        let title = bib.title?;

        let mut paper = NormalizedPaper::new(title, "doaj");
        paper.authors = bib.author.into_iter().filter_map(|a| a.name).collect();
        paper.abstract_text = bib.abstract_text;
        if let Some(year) = bib.year {
            paper.year = year;
        }
        paper.doi = bib
            .identifier
            .into_iter()
            .find(|i| i.id_type.as_deref() == Some("doi"))
            .and_then(|i| i.id);
        paper.full_text_url = bib
            .link
            .into_iter()
            .find(|l| l.link_type.as_deref() == Some("fulltext"))
            .and_then(|l| l.url);
        paper.journal = bib.journal.and_then(|j| j.title);
        Some(paper)
    }
}

#[async_trait]
impl SourceAdapter for DoajAdapter {
    fn name(&self) -> &'static str {
        "doaj"
    }

    fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor {
            name: "doaj",
            description: "DOAJ - Directory of Open Access Journals",
            query_syntax: "Lucene path query",
            requires_credential: false,
            min_interval: Duration::from_millis(500),
            max_results: 50,
            native: &[QueryCapability::YearRange],
        }
    }

    async fn search(
        &self,
        query: &SearchQuery,
        context: &SearchContext,
    ) -> Result<Vec<NormalizedPaper>, AdapterError> {
        let url = self.build_search_url(query);
        debug!("DOAJ search URL: {}", url);

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
        let parsed: DoajResponse = serde_json::from_str(&body)
            .map_err(|e| AdapterError::Parse(format!("invalid JSON: {e}")))?;

        let papers: Vec<NormalizedPaper> = parsed
            .results
            .into_iter()
            .filter_map(Self::convert_article)
            .collect();

        debug!("DOAJ returned {} records", papers.len());
        Ok(papers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_query_includes_lucene_year_range() {
        let query = SearchQuery {
            query: "open educational resources".to_string(),
            year_start: Some(2019),
            year_end: Some(2024),
            ..SearchQuery::default()
        };

        assert_eq!(
            DoajAdapter::build_path_query(&query),
            "open educational resources AND bibjson.year:[2019 TO 2024]"
        );
    }

    #[test]
    fn test_search_url_encodes_path_segment() {
        let adapter = DoajAdapter::new(Client::new(), None);
        let query = SearchQuery {
            query: "peer review".to_string(),
            year_end: Some(2021),
            ..SearchQuery::default()
        };

        let url = adapter.build_search_url(&query);
        assert!(url.starts_with("https://doaj.org/api/v2/search/articles/"));
        assert!(url.contains("%5B%2A%20TO%202021%5D"));
        assert!(url.ends_with(&format!("?page=1&pageSize={}", adapter.descriptor().max_results)));
    }

    #[test]
    fn test_parse_and_convert() {
        let body = r#"{
            "total": 73,
            "results": [{
                "bibjson": {
                    "title": "Openness and Participation in MOOCs",
                    "author": [{"name": "Silva, Ana"}],
                    "abstract": "Participation patterns across three cohorts.",
                    "year": "2022",
                    "identifier": [
                        {"type": "pissn", "id": "1234-5678"},
                        {"type": "doi", "id": "10.1000/moocs.2022.17"}
                    ],
                    "link": [
                        {"type": "fulltext", "url": "https://journal.example/mooc17.pdf"}
                    ],
                    "journal": {"title": "International Review of Open Learning"}
                }
            }]
        }"#;

        let parsed: DoajResponse = serde_json::from_str(body).unwrap();
        let papers: Vec<NormalizedPaper> = parsed
            .results
            .into_iter()
            .filter_map(DoajAdapter::convert_article)
            .collect();

        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].doi.as_deref(), Some("10.1000/moocs.2022.17"));
        assert_eq!(
            papers[0].journal.as_deref(),
            Some("International Review of Open Learning")
        );
        assert_eq!(papers[0].year, "2022");
    }
}

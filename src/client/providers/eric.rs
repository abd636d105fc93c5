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

/// ERIC API response wrapper (Solr response shape)
#[derive(Debug, Deserialize)]
struct EricResponse {
    response: EricDocList,
}

#[derive(Debug, Deserialize)]
struct EricDocList {
    #[serde(rename = "numFound")]
    num_found: Option<u64>,
    #[serde(default)]
    docs: Vec<EricDoc>,
}

#[derive(Debug, Deserialize)]
struct EricDoc {
    id: Option<String>,
    title: Option<String>,
    #[serde(default)]
    author: Vec<String>,
    description: Option<String>,
    publicationdateyear: Option<u16>,
    source: Option<String>,
    e_fulltextauth: Option<bool>,
    url: Option<String>,
}

/// ERIC (Education Resources Information Center) adapter.
///
/// ERIC fronts its index with Solr, so structured constraints travel as
/// `fq` filter-query parameters next to the free-text `search` term.
pub struct EricAdapter {
    client: Client,
    base_url: String,
}

impl EricAdapter {
    pub fn new(client: Client, base_url: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.unwrap_or_else(|| "https://api.ies.ed.gov".to_string()),
        }
    }

    fn build_search_url(&self, query: &SearchQuery) -> Result<String, AdapterError> {
        let mut url = Url::parse(&format!("{}/eric/", self.base_url))
            .map_err(|e| AdapterError::Parse(format!("invalid base URL: {e}")))?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("search", query.query.trim());
            pairs.append_pair("format", "json");
            pairs.append_pair("rows", &self.descriptor().max_results.to_string());
            pairs.append_pair("start", "0");
            pairs.append_pair(
                "fields",
                "id, title, author, description, publicationdateyear, source, e_fulltextauth, url",
            );

            match (query.year_start, query.year_end) {
                (Some(start), Some(end)) => {
                    pairs.append_pair("fq", &format!("publicationdateyear:[{start} TO {end}]"));
                }
                (Some(start), None) => {
                    pairs.append_pair("fq", &format!("publicationdateyear:[{start} TO *]"));
                }
                (None, Some(end)) => {
                    pairs.append_pair("fq", &format!("publicationdateyear:[* TO {end}]"));
                }
                (None, None) => {}
            }
            if let Some(level) = &query.education_level {
                pairs.append_pair("fq", &format!("educationlevel:\"{level}\""));
            }
            if let Some(ptype) = &query.publication_type {
                pairs.append_pair("fq", &format!("pubtype:\"{ptype}\""));
            }
            if let Some(subject) = &query.discipline {
                pairs.append_pair("fq", &format!("subject:\"{subject}\""));
            }
        }

        Ok(url.to_string())
    }

    fn convert_doc(doc: EricDoc) -> Option<NormalizedPaper> {
        let title = doc.title?;
        let mut paper = NormalizedPaper::new(title, "eric");
        paper.authors = doc.author;
        paper.abstract_text = doc.description;
        if let Some(year) = doc.publicationdateyear {
            paper.year = year.to_string();
        }
        paper.journal = doc.source;
        // Authorized full text lives on the ERIC file server keyed by record id
        paper.full_text_url = match (doc.e_fulltextauth, &doc.id) {
            (Some(true), Some(id)) => Some(format!("https://files.eric.ed.gov/fulltext/{id}.pdf")),
            _ => doc.url,
        };
        Some(paper)
    }
}

#[async_trait]
impl SourceAdapter for EricAdapter {
    fn name(&self) -> &'static str {
        "eric"
    }

    fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor {
            name: "eric",
            description: "ERIC - Education Resources Information Center (IES)",
            query_syntax: "Solr filter queries",
            requires_credential: false,
            min_interval: Duration::from_millis(500),
            max_results: 50,
            native: &[
                QueryCapability::YearRange,
                QueryCapability::EducationLevel,
                QueryCapability::PublicationType,
                QueryCapability::Discipline,
            ],
        }
    }

    async fn search(
        &self,
        query: &SearchQuery,
        context: &SearchContext,
    ) -> Result<Vec<NormalizedPaper>, AdapterError> {
        let url = self.build_search_url(query)?;
        debug!("ERIC search URL: {}", url);

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
        let parsed: EricResponse = serde_json::from_str(&body)
            .map_err(|e| AdapterError::Parse(format!("invalid JSON: {e}")))?;

        let total = parsed.response.num_found.unwrap_or(0);
        let papers: Vec<NormalizedPaper> = parsed
            .response
            .docs
            .into_iter()
            .filter_map(Self::convert_doc)
            .collect();

        info!("ERIC returned {} of {} matching records", papers.len(), total);
        Ok(papers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> EricAdapter {
        EricAdapter::new(Client::new(), None)
    }

    #[test]
    fn test_search_url_carries_solr_filter_queries() {
        let query = SearchQuery {
            query: "project based learning".to_string(),
            year_start: Some(2019),
            year_end: Some(2023),
            education_level: Some("Higher Education".to_string()),
            ..SearchQuery::default()
        };

        let url = adapter().build_search_url(&query).unwrap();
        assert!(url.contains("search=project+based+learning"));
        assert!(url.contains(&format!("rows={}", adapter().descriptor().max_results)));
        assert!(url.contains("fq=publicationdateyear%3A%5B2019+TO+2023%5D"));
        assert!(url.contains("fq=educationlevel%3A%22Higher+Education%22"));
    }

    #[test]
    fn test_open_year_bound_uses_wildcard() {
        let query = SearchQuery {
            query: "stem retention".to_string(),
            year_start: Some(2020),
            ..SearchQuery::default()
        };

        let url = adapter().build_search_url(&query).unwrap();
        assert!(url.contains("%5B2020+TO+*%5D"));
    }

    #[test]
    fn test_parse_and_convert() {
        let body = r#"{
            "response": {
                "numFound": 212,
                "start": 0,
                "docs": [{
                    "id": "EJ1290012",
                    "title": "Active Learning in Large Lectures",
                    "author": ["Garcia, Maria", "Chen, Wei"],
                    "description": "Examines active learning strategies in lectures.",
                    "publicationdateyear": 2021,
                    "source": "Journal of Engineering Education",
                    "e_fulltextauth": true,
                    "url": "https://eric.ed.gov/?id=EJ1290012"
                }, {
                    "id": "ED610000",
                    "description": "A record with no title is unusable."
                }]
            }
        }"#;

        let parsed: EricResponse = serde_json::from_str(body).unwrap();
        let papers: Vec<NormalizedPaper> = parsed
            .response
            .docs
            .into_iter()
            .filter_map(EricAdapter::convert_doc)
            .collect();

        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].year, "2021");
        assert_eq!(papers[0].source, "eric");
        assert_eq!(
            papers[0].full_text_url.as_deref(),
            Some("https://files.eric.ed.gov/fulltext/EJ1290012.pdf")
        );
    }
}

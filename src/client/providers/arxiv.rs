use super::traits::{
    AdapterError, QueryCapability, SearchContext, SearchQuery, SourceAdapter, SourceDescriptor,
};
use crate::client::NormalizedPaper;
use async_trait::async_trait;
use reqwest::Client;
use roxmltree::Document;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// arXiv adapter over the Atom query API.
///
/// The dialect is field-prefixed (`all:`, `ti:`, `au:`) with boolean
/// operators; year bounds become a `submittedDate` range clause. arXiv
/// asks clients for a three second gap between calls.
pub struct ArxivAdapter {
    client: Client,
    base_url: String,
}

/// Atom text nodes wrap long lines; rejoin them into single-space text.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl ArxivAdapter {
    pub fn new(client: Client, base_url: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.unwrap_or_else(|| "https://export.arxiv.org".to_string()),
        }
    }

    fn build_search_query(query: &SearchQuery) -> String {
        let term = query.query.trim().replace('"', "");
        let mut q = format!("all:\"{term}\"");
        match (query.year_start, query.year_end) {
            (Some(start), Some(end)) => {
                q.push_str(&format!(
                    " AND submittedDate:[{start}01010000 TO {end}12312359]"
                ));
            }
            (Some(start), None) => {
                q.push_str(&format!(" AND submittedDate:[{start}01010000 TO 300001010000]"));
            }
            (None, Some(end)) => {
                q.push_str(&format!(" AND submittedDate:[100001010000 TO {end}12312359]"));
            }
            (None, None) => {}
        }
        q
    }

    fn build_search_url(&self, query: &SearchQuery) -> Result<String, AdapterError> {
        let mut url = Url::parse(&format!("{}/api/query", self.base_url))
            .map_err(|e| AdapterError::Parse(format!("invalid base URL: {e}")))?;

        url.query_pairs_mut()
            .append_pair("search_query", &Self::build_search_query(query))
            .append_pair("start", "0")
            .append_pair("max_results", &self.descriptor().max_results.to_string())
            .append_pair("sortBy", "relevance")
            .append_pair("sortOrder", "descending");

        Ok(url.to_string())
    }

    fn parse_feed(body: &str) -> Result<Vec<NormalizedPaper>, AdapterError> {
        let doc = Document::parse(body)
            .map_err(|e| AdapterError::Parse(format!("invalid Atom XML: {e}")))?;

        let mut papers = Vec::new();
        for entry in doc.descendants().filter(|n| n.has_tag_name("entry")) {
            let mut title = None;
            let mut paper = NormalizedPaper::new("", "arxiv");
            paper.journal = Some("arXiv".to_string());

            for child in entry.children().filter(roxmltree::Node::is_element) {
                match child.tag_name().name() {
                    "title" => {
                        if let Some(text) = child.text() {
                            title = Some(collapse_whitespace(text));
                        }
                    }
                    "summary" => {
                        if let Some(text) = child.text() {
                            paper.abstract_text = Some(collapse_whitespace(text));
                        }
                    }
                    "published" => {
                        // Format: YYYY-MM-DDTHH:MM:SSZ
                        if let Some(year) = child
                            .text()
                            .and_then(|t| t.split('-').next())
                            .and_then(|y| y.parse::<u16>().ok())
                        {
                            paper.year = year.to_string();
                        }
                    }
                    "author" => {
                        for name in child.descendants().filter(|n| n.has_tag_name("name")) {
                            if let Some(author) = name.text() {
                                paper.authors.push(author.trim().to_string());
                            }
                        }
                    }
                    "doi" => {
                        if let Some(doi) = child.text() {
                            paper.doi = Some(doi.trim().to_string());
                        }
                    }
                    "link" => {
                        if child.attribute("type") == Some("application/pdf") {
                            if let Some(href) = child.attribute("href") {
                                paper.full_text_url = Some(href.to_string());
                            }
                        }
                    }
                    _ => {}
                }
            }

            if let Some(title) = title {
                paper.title = title;
                papers.push(paper);
            }
        }

        Ok(papers)
    }
}

#[async_trait]
impl SourceAdapter for ArxivAdapter {
    fn name(&self) -> &'static str {
        "arxiv"
    }

    fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor {
            name: "arxiv",
            description: "arXiv - Physics, math, and CS e-prints",
            query_syntax: "Atom API field prefixes",
            requires_credential: false,
            min_interval: Duration::from_millis(3000),
            max_results: 40,
            native: &[QueryCapability::YearRange],
        }
    }

    async fn search(
        &self,
        query: &SearchQuery,
        context: &SearchContext,
    ) -> Result<Vec<NormalizedPaper>, AdapterError> {
        let url = self.build_search_url(query)?;
        debug!("arXiv search URL: {}", url);

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
        let papers = Self::parse_feed(&body)?;

        debug!("arXiv returned {} records", papers.len());
        Ok(papers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query_includes_submitted_date_range() {
        let query = SearchQuery {
            query: "intelligent tutoring".to_string(),
            year_start: Some(2020),
            year_end: Some(2023),
            ..SearchQuery::default()
        };

        assert_eq!(
            ArxivAdapter::build_search_query(&query),
            "all:\"intelligent tutoring\" AND submittedDate:[202001010000 TO 202312312359]"
        );
    }

    #[test]
    fn test_search_url_page_size_matches_descriptor() {
        let adapter = ArxivAdapter::new(Client::new(), None);
        let query = SearchQuery {
            query: "spectral methods".to_string(),
            ..SearchQuery::default()
        };
        let url = adapter.build_search_url(&query).unwrap();
        assert!(url.contains(&format!("max_results={}", adapter.descriptor().max_results)));
    }

    #[test]
    fn test_parse_atom_feed() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <entry>
    <id>http://arxiv.org/abs/2101.04667v2</id>
    <title>Neural Approaches to
 Knowledge Tracing</title>
    <summary>  A survey of neural knowledge tracing models.  </summary>
    <published>2021-01-12T18:44:10Z</published>
    <author><name>Li Wang</name></author>
    <author><name>Sofia Marek</name></author>
    <arxiv:doi>10.48550/arXiv.2101.04667</arxiv:doi>
    <link href="http://arxiv.org/pdf/2101.04667v2" rel="related" type="application/pdf"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2102.00001v1</id>
    <summary>An entry with no title is skipped.</summary>
  </entry>
</feed>"#;

        let papers = ArxivAdapter::parse_feed(body).unwrap();
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].title, "Neural Approaches to Knowledge Tracing");
        assert_eq!(papers[0].year, "2021");
        assert_eq!(papers[0].authors.len(), 2);
        assert_eq!(papers[0].doi.as_deref(), Some("10.48550/arXiv.2101.04667"));
        assert_eq!(
            papers[0].full_text_url.as_deref(),
            Some("http://arxiv.org/pdf/2101.04667v2")
        );
        assert_eq!(papers[0].journal.as_deref(), Some("arXiv"));
    }

    #[test]
    fn test_malformed_xml_is_a_parse_error() {
        assert!(matches!(
            ArxivAdapter::parse_feed("this is not xml <"),
            Err(AdapterError::Parse(_))
        ));
    }
}

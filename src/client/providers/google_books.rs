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
struct VolumesResponse {
    #[serde(rename = "totalItems")]
    #[allow(dead_code)]
    total_items: Option<u64>,
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
struct Volume {
    #[serde(rename = "volumeInfo")]
    volume_info: VolumeInfo,
    #[serde(rename = "accessInfo")]
    access_info: Option<AccessInfo>,
}

#[derive(Debug, Deserialize)]
struct VolumeInfo {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    publisher: Option<String>,
    #[serde(rename = "publishedDate")]
    published_date: Option<String>,
    description: Option<String>,
    #[serde(rename = "canonicalVolumeLink")]
    canonical_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccessInfo {
    pdf: Option<PdfAccess>,
}

#[derive(Debug, Deserialize)]
struct PdfAccess {
    #[serde(rename = "isAvailable")]
    is_available: Option<bool>,
    #[serde(rename = "downloadLink")]
    download_link: Option<String>,
}

/// Google Books volumes adapter.
///
/// The dialect is in-query field operators (`intitle:`, `inauthor:`,
/// `subject:`) rather than separate parameters; a discipline facet is
/// appended as a `subject:` operator. Books carry no DOI or citation
/// data, so those fields stay empty.
pub struct GoogleBooksAdapter {
    client: Client,
    base_url: String,
}

impl GoogleBooksAdapter {
    pub fn new(client: Client, base_url: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.unwrap_or_else(|| "https://www.googleapis.com".to_string()),
        }
    }

    fn build_q(query: &SearchQuery) -> String {
        let mut q = query.query.trim().to_string();
        if let Some(subject) = &query.discipline {
            q.push_str(&format!(" subject:\"{subject}\""));
        }
        q
    }

    fn build_search_url(&self, query: &SearchQuery) -> String {
        format!(
            "{}/books/v1/volumes?q={}&maxResults={}&printType=books",
            self.base_url,
            urlencoding::encode(&Self::build_q(query)),
            self.descriptor().max_results,
        )
    }

    fn convert_volume(volume: Volume) -> Option<NormalizedPaper> {
        let info = volume.volume_info;
        let title = info.title?;

        let mut paper = NormalizedPaper::new(title, "google_books");
        paper.authors = info.authors;
        paper.abstract_text = info.description;
        // publishedDate is "YYYY", "YYYY-MM", or "YYYY-MM-DD"
        if let Some(year) = info
            .published_date
            .as_deref()
            .and_then(|d| d.split('-').next())
            .and_then(|y| y.parse::<u16>().ok())
        {
            paper.year = year.to_string();
        }
        let pdf_link = volume.access_info.and_then(|access| {
            let pdf = access.pdf?;
            if pdf.is_available.unwrap_or(false) {
                pdf.download_link
            } else {
                None
            }
        });
        paper.full_text_url = pdf_link.or(info.canonical_link);
        paper.journal = info.publisher;
        Some(paper)
    }
}

#[async_trait]
impl SourceAdapter for GoogleBooksAdapter {
    fn name(&self) -> &'static str {
        "google_books"
    }

    fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor {
            name: "google_books",
            description: "Google Books - Book and monograph index",
            query_syntax: "field operators (intitle:, inauthor:, subject:)",
            requires_credential: false,
            min_interval: Duration::from_millis(500),
            max_results: 40,
            native: &[QueryCapability::Discipline],
        }
    }

    async fn search(
        &self,
        query: &SearchQuery,
        context: &SearchContext,
    ) -> Result<Vec<NormalizedPaper>, AdapterError> {
        let url = self.build_search_url(query);
        debug!("Google Books search URL: {}", url);

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
        let parsed: VolumesResponse = serde_json::from_str(&body)
            .map_err(|e| AdapterError::Parse(format!("invalid JSON: {e}")))?;

        let papers: Vec<NormalizedPaper> = parsed
            .items
            .into_iter()
            .filter_map(Self::convert_volume)
            .collect();

        debug!("Google Books returned {} records", papers.len());
        Ok(papers)
    }
}

use super::traits::{
    AdapterError, QueryCapability, SearchContext, SearchQuery, SourceAdapter, SourceDescriptor,
};
use crate::client::NormalizedPaper;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, warn};

/// Google Scholar adapter over the public result page.
///
/// Scholar has no API; this adapter scrapes the HTML index, standing in
/// for the scraped-web class of providers. Year bounds travel as the
/// `as_ylo`/`as_yhi` URL parameters. Scholar throttles aggressively, so
/// the descriptor interval is the longest in the roster and a served
/// captcha page is reported as rate limiting.
pub struct GoogleScholarAdapter {
    client: Client,
    base_url: String,
}

impl GoogleScholarAdapter {
    pub fn new(client: Client, base_url: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.unwrap_or_else(|| "https://scholar.google.com".to_string()),
        }
    }

    fn build_search_url(&self, query: &SearchQuery) -> String {
        let mut url = format!(
            "{}/scholar?hl=en&q={}&num={}",
            self.base_url,
            urlencoding::encode(query.query.trim()),
            self.descriptor().max_results,
        );
        if let Some(start) = query.year_start {
            url.push_str(&format!("&as_ylo={start}"));
        }
        if let Some(end) = query.year_end {
            url.push_str(&format!("&as_yhi={end}"));
        }
        url
    }

    /// Strip the inline result-type markers Scholar prepends to titles
    /// ("[PDF]", "[BOOK]", "[CITATION]").
    fn clean_title(raw: &str) -> String {
        let mut title = raw.trim();
        while title.starts_with('[') {
            match title.find(']') {
                Some(end) => title = title[end + 1..].trim_start(),
                None => break,
            }
        }
        title.to_string()
    }

    /// The `gs_a` byline reads "A Author, B Author - Venue, 2019 - site.com".
    fn parse_byline(byline: &str) -> (Vec<String>, Option<String>, Option<u16>) {
        let year = Regex::new(r"\b(1[89]\d{2}|20\d{2})\b")
            .ok()
            .and_then(|re| re.find(byline))
            .and_then(|m| m.as_str().parse::<u16>().ok());

        let mut sections = byline.splitn(3, " - ");
        let authors_section = sections.next().unwrap_or("");
        let venue_section = sections.next();

        let authors: Vec<String> = authors_section
            .split(',')
            .map(|a| a.trim().trim_end_matches('\u{2026}').trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();

        let journal = venue_section
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty() && v.parse::<u16>().is_err())
            .map(str::to_string);

        (authors, journal, year)
    }

    fn parse_results(html: &str) -> Result<Vec<NormalizedPaper>, AdapterError> {
        // A served challenge page means the crawler was throttled
        if html.contains("gs_captcha") || html.contains("unusual traffic") {
            return Err(AdapterError::RateLimit);
        }

        let selector = |css: &str| {
            Selector::parse(css).map_err(|e| AdapterError::Parse(format!("invalid selector: {e}")))
        };
        let result_sel = selector("div.gs_r")?;
        let title_sel = selector("h3.gs_rt")?;
        let link_sel = selector("h3.gs_rt a")?;
        let byline_sel = selector("div.gs_a")?;
        let snippet_sel = selector("div.gs_rs")?;
        let cite_sel = selector("div.gs_fl a")?;
        let pdf_sel = selector("div.gs_or_ggsm a")?;

        let cited_by = Regex::new(r"Cited by (\d+)")
            .map_err(|e| AdapterError::Parse(format!("invalid pattern: {e}")))?;

        let document = Html::parse_document(html);
        let mut papers = Vec::new();

        for block in document.select(&result_sel) {
            let Some(title_el) = block.select(&title_sel).next() else {
                continue;
            };
            let title = Self::clean_title(&title_el.text().collect::<String>());
            if title.is_empty() {
                continue;
            }

            let mut paper = NormalizedPaper::new(title, "google_scholar");

            if let Some(byline_el) = block.select(&byline_sel).next() {
                let byline = byline_el.text().collect::<String>();
                let (authors, journal, year) = Self::parse_byline(&byline);
                paper.authors = authors;
                paper.journal = journal;
                if let Some(year) = year {
                    paper.year = year.to_string();
                }
            }

            paper.abstract_text = block
                .select(&snippet_sel)
                .next()
                .map(|el| el.text().collect::<String>())
                .filter(|s| !s.trim().is_empty());

            paper.citation_count = block
                .select(&cite_sel)
                .filter_map(|a| {
                    cited_by
                        .captures(&a.text().collect::<String>())
                        .and_then(|c| c.get(1))
                        .and_then(|m| m.as_str().parse::<u32>().ok())
                })
                .next();

            paper.full_text_url = block
                .select(&pdf_sel)
                .next()
                .and_then(|a| a.value().attr("href"))
                .or_else(|| {
                    block
                        .select(&link_sel)
                        .next()
                        .and_then(|a| a.value().attr("href"))
                })
                .map(str::to_string);

            papers.push(paper);
        }

        Ok(papers)
    }
}

#[async_trait]
impl SourceAdapter for GoogleScholarAdapter {
    fn name(&self) -> &'static str {
        "google_scholar"
    }

    fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor {
            name: "google_scholar",
            description: "Google Scholar - Scraped web index of scholarly literature",
            query_syntax: "scholar URL parameters",
            requires_credential: false,
            min_interval: Duration::from_millis(5000),
            max_results: 20,
            native: &[QueryCapability::YearRange],
        }
    }

    async fn search(
        &self,
        query: &SearchQuery,
        context: &SearchContext,
    ) -> Result<Vec<NormalizedPaper>, AdapterError> {
        let url = self.build_search_url(query);
        debug!("Google Scholar search URL: {}", url);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, &context.user_agent)
            .timeout(context.timeout)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 || status.as_u16() == 403 {
            warn!("Google Scholar throttled the request (HTTP {})", status);
            return Err(AdapterError::RateLimit);
        }
        if !status.is_success() {
            return Err(AdapterError::Http(status.as_u16()));
        }

        let body = response.text().await?;
        let papers = Self::parse_results(&body)?;

        debug!("Google Scholar returned {} records", papers.len());
        Ok(papers)
    }
}

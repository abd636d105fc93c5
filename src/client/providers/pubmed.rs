use super::traits::{
    AdapterError, QueryCapability, SearchContext, SearchQuery, SourceAdapter, SourceDescriptor,
};
use crate::client::NormalizedPaper;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct ESearchResponse {
    esearchresult: ESearchResult,
}

#[derive(Debug, Deserialize)]
struct ESearchResult {
    count: Option<String>,
    #[serde(default)]
    idlist: Vec<String>,
    #[serde(default)]
    errorlist: Option<ErrorList>,
}

#[derive(Debug, Deserialize)]
struct ErrorList {
    phrasesnotfound: Option<Vec<String>>,
}

/// esummary returns `result` as a map of PMID -> record plus a `uids`
/// ordering key, so values are decoded per entry.
#[derive(Debug, Deserialize)]
struct ESummaryResponse {
    result: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct PubMedSummary {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<PubMedAuthor>,
    #[serde(rename = "fulljournalname")]
    journal_name: Option<String>,
    #[serde(rename = "pubdate")]
    pub_date: Option<String>,
    #[serde(rename = "articleids")]
    #[serde(default)]
    article_ids: Vec<ArticleId>,
}

#[derive(Debug, Deserialize)]
struct PubMedAuthor {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArticleId {
    idtype: String,
    value: String,
}

/// PubMed adapter over the NCBI E-utilities pipeline.
///
/// Two-phase: `esearch` resolves the term to PMIDs, `esummary` fetches
/// the records. The term dialect carries controlled vocabulary —
/// `[MeSH Terms]` for subjects, `[pt]` for publication/study types,
/// `YYYY:YYYY[dp]` for date ranges.
pub struct PubMedAdapter {
    client: Client,
    base_url: String,
}

impl PubMedAdapter {
    pub fn new(client: Client, base_url: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.unwrap_or_else(|| "https://eutils.ncbi.nlm.nih.gov".to_string()),
        }
    }

    /// Assemble the esearch term from the free-text query plus any
    /// controlled-vocabulary constraints.
    fn build_term(query: &SearchQuery) -> String {
        let mut term = query.query.trim().to_string();
        if let Some(subject) = &query.discipline {
            term.push_str(&format!(" AND \"{subject}\"[MeSH Terms]"));
        }
        if let Some(ptype) = &query.publication_type {
            term.push_str(&format!(" AND \"{ptype}\"[pt]"));
        }
        if let Some(stype) = &query.study_type {
            term.push_str(&format!(" AND \"{stype}\"[pt]"));
        }
        match (query.year_start, query.year_end) {
            (Some(start), Some(end)) => term.push_str(&format!(" AND {start}:{end}[dp]")),
            (Some(start), None) => term.push_str(&format!(" AND {start}:3000[dp]")),
            (None, Some(end)) => term.push_str(&format!(" AND 1000:{end}[dp]")),
            (None, None) => {}
        }
        term
    }

    async fn esearch(
        &self,
        query: &SearchQuery,
        context: &SearchContext,
    ) -> Result<Vec<String>, AdapterError> {
        let url = format!("{}/entrez/eutils/esearch.fcgi", self.base_url);
        let term = Self::build_term(query);
        debug!("PubMed esearch term: {}", term);

        let mut params = vec![
            ("db", "pubmed".to_string()),
            ("term", term),
            ("retmode", "json".to_string()),
            ("retmax", self.descriptor().max_results.to_string()),
            ("sort", "relevance".to_string()),
        ];
        // NCBI keys ride as a query parameter; keep them out of the logs
        if let Some(api_key) = query.credential_for("pubmed") {
            params.push(("api_key", api_key.to_string()));
        }

        let response = self
            .client
            .get(&url)
            .query(&params)
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

        let parsed: ESearchResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::Parse(format!("invalid esearch JSON: {e}")))?;

        if let Some(error_list) = &parsed.esearchresult.errorlist {
            if let Some(phrases) = &error_list.phrasesnotfound {
                if !phrases.is_empty() {
                    warn!("PubMed could not match phrases: {:?}", phrases);
                }
            }
        }

        debug!(
            "PubMed esearch matched {} records",
            parsed.esearchresult.count.as_deref().unwrap_or("0")
        );
        Ok(parsed.esearchresult.idlist)
    }

    async fn esummary(
        &self,
        pmids: &[String],
        api_key: Option<&str>,
        context: &SearchContext,
    ) -> Result<Vec<NormalizedPaper>, AdapterError> {
        if pmids.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/entrez/eutils/esummary.fcgi", self.base_url);
        let mut params = vec![
            ("db", "pubmed".to_string()),
            ("id", pmids.join(",")),
            ("retmode", "json".to_string()),
        ];
        if let Some(key) = api_key {
            params.push(("api_key", key.to_string()));
        }

        let response = self
            .client
            .get(&url)
            .query(&params)
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

        let parsed: ESummaryResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::Parse(format!("invalid esummary JSON: {e}")))?;

        let mut papers = Vec::new();
        for pmid in pmids {
            let Some(value) = parsed.result.get(pmid) else {
                continue;
            };
            match serde_json::from_value::<PubMedSummary>(value.clone()) {
                Ok(summary) => {
                    if let Some(paper) = Self::convert_summary(pmid, summary) {
                        papers.push(paper);
                    }
                }
                Err(e) => warn!("Skipping malformed PubMed record {}: {}", pmid, e),
            }
        }
        Ok(papers)
    }

    fn convert_summary(pmid: &str, summary: PubMedSummary) -> Option<NormalizedPaper> {
        let title = summary.title?;

        let mut paper = NormalizedPaper::new(title, "pubmed");
        paper.authors = summary.authors.into_iter().filter_map(|a| a.name).collect();
        // pubdate looks like "2021 Mar 15" or "2021"
        if let Some(year) = summary
            .pub_date
            .as_deref()
            .and_then(|d| d.split_whitespace().next())
            .and_then(|y| y.parse::<u16>().ok())
        {
            paper.year = year.to_string();
        }
        paper.doi = summary
            .article_ids
            .iter()
            .find(|id| id.idtype == "doi")
            .map(|id| id.value.clone());
        paper.full_text_url = Some(format!("https://pubmed.ncbi.nlm.nih.gov/{pmid}/"));
        paper.journal = summary.journal_name;
        Some(paper)
    }
}

#[async_trait]
impl SourceAdapter for PubMedAdapter {
    fn name(&self) -> &'static str {
        "pubmed"
    }

    fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor {
            name: "pubmed",
            description: "PubMed - Biomedical literature (NLM)",
            query_syntax: "E-utilities term syntax",
            requires_credential: false,
            min_interval: Duration::from_millis(350),
            max_results: 30,
            native: &[
                QueryCapability::YearRange,
                QueryCapability::Discipline,
                QueryCapability::PublicationType,
                QueryCapability::StudyType,
            ],
        }
    }

    async fn search(
        &self,
        query: &SearchQuery,
        context: &SearchContext,
    ) -> Result<Vec<NormalizedPaper>, AdapterError> {
        let pmids = self.esearch(query, context).await?;
        let papers = self
            .esummary(&pmids, query.credential_for("pubmed"), context)
            .await?;
        debug!("PubMed returned {} records", papers.len());
        Ok(papers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_carries_mesh_and_date_range() {
        let query = SearchQuery {
            query: "simulation training".to_string(),
            discipline: Some("Nursing Education".to_string()),
            study_type: Some("Randomized Controlled Trial".to_string()),
            year_start: Some(2018),
            year_end: Some(2023),
            ..SearchQuery::default()
        };

        let term = PubMedAdapter::build_term(&query);
        assert_eq!(
            term,
            "simulation training AND \"Nursing Education\"[MeSH Terms] \
             AND \"Randomized Controlled Trial\"[pt] AND 2018:2023[dp]"
        );
    }

    #[test]
    fn test_open_ended_date_range() {
        let query = SearchQuery {
            query: "telehealth".to_string(),
            year_start: Some(2021),
            ..SearchQuery::default()
        };
        assert!(PubMedAdapter::build_term(&query).ends_with("AND 2021:3000[dp]"));
    }

    #[test]
    fn test_convert_summary() {
        let value = serde_json::json!({
            "uid": "33577987",
            "title": "Virtual Patient Simulation in Nursing Education.",
            "authors": [{"name": "Kim H"}, {"name": "Park J"}],
            "fulljournalname": "Nurse Education Today",
            "pubdate": "2021 Mar 15",
            "articleids": [
                {"idtype": "pubmed", "value": "33577987"},
                {"idtype": "doi", "value": "10.1016/j.nedt.2021.104743"}
            ]
        });

        let summary: PubMedSummary = serde_json::from_value(value).unwrap();
        let paper = PubMedAdapter::convert_summary("33577987", summary).unwrap();

        assert_eq!(paper.year, "2021");
        assert_eq!(paper.doi.as_deref(), Some("10.1016/j.nedt.2021.104743"));
        assert_eq!(
            paper.full_text_url.as_deref(),
            Some("https://pubmed.ncbi.nlm.nih.gov/33577987/")
        );
        assert_eq!(paper.journal.as_deref(), Some("Nurse Education Today"));
    }

    #[test]
    fn test_esummary_result_map_decoding() {
        let body = r#"{
            "result": {
                "uids": ["111", "222"],
                "111": {"title": "First Record", "pubdate": "2020"},
                "222": {"title": "Second Record", "pubdate": "2019 Dec"}
            }
        }"#;

        let parsed: ESummaryResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.result.contains_key("111"));
        let summary: PubMedSummary =
            serde_json::from_value(parsed.result["222"].clone()).unwrap();
        assert_eq!(summary.title.as_deref(), Some("Second Record"));
    }
}

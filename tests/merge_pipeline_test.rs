//! Pipeline-level properties of sanitize, deduplicate, and rank working
//! together through the public library API.
//!
//! The aggregation flow tests cover the network path; these cover the
//! pure merge pipeline with inputs shaped like real provider output,
//! including the determinism that cached result sets depend on.

use paper_search_engine::services::{deduplicate, identity_key, rank, sanitize_paper};
use paper_search_engine::{AggregatedResultSet, NormalizedPaper, SearchQuery, SortBy};
use std::collections::BTreeMap;

fn priority() -> Vec<String> {
    vec![
        "crossref".to_string(),
        "openalex".to_string(),
        "eric".to_string(),
        "doaj".to_string(),
    ]
}

fn raw_paper(title: &str, source: &str, year: &str) -> NormalizedPaper {
    let mut p = NormalizedPaper::new(title, source);
    p.year = year.to_string();
    p
}

/// Runs a record set through the same stages the aggregator applies
/// after collection.
fn pipeline(papers: Vec<NormalizedPaper>, query: &SearchQuery) -> Vec<NormalizedPaper> {
    let sanitized: Vec<NormalizedPaper> =
        papers.into_iter().filter_map(sanitize_paper).collect();
    let mut merged = deduplicate(sanitized, &priority());
    rank(&mut merged, query);
    merged
}

#[test]
fn test_markup_variants_of_one_title_collapse() {
    // Same work as ERIC and DOAJ would each render it
    let papers = vec![
        raw_paper(
            "<b>Growth Mindset &amp; Achievement:</b> A Meta-Analysis",
            "doaj",
            "2018",
        ),
        raw_paper("Growth mindset   achievement a meta-analysis", "eric", "2018"),
    ];

    let merged = pipeline(papers, &SearchQuery::default());
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].source, "eric");
    assert_eq!(merged[0].merged_from, vec!["eric", "doaj"]);
}

#[test]
fn test_doi_prefix_variants_collapse() {
    let mut a = raw_paper("Title as Crossref has it", "crossref", "2020");
    a.doi = Some("https://doi.org/10.1234/JEE.2020.0042".to_string());
    let mut b = raw_paper("Title as OpenAlex has it", "openalex", "2020");
    b.doi = Some("doi:10.1234/jee.2020.0042".to_string());

    let merged = pipeline(vec![b, a], &SearchQuery::default());
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].doi.as_deref(), Some("10.1234/jee.2020.0042"));
    assert_eq!(merged[0].source, "crossref");
}

#[test]
fn test_untitled_records_never_reach_dedup() {
    let papers = vec![
        raw_paper("<i> </i>", "doaj", "2020"),
        raw_paper("A Usable Record", "eric", "2020"),
    ];

    let merged = pipeline(papers, &SearchQuery::default());
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].title, "A Usable Record");
}

#[test]
fn test_output_identity_keys_are_unique() {
    let mut with_doi = raw_paper("Shared Title", "crossref", "2021");
    with_doi.doi = Some("10.1/alpha".to_string());
    let mut same_doi = raw_paper("shared title!", "doaj", "2021");
    same_doi.doi = Some("10.1/ALPHA".to_string());

    let papers = vec![
        with_doi,
        same_doi,
        raw_paper("Shared Title", "eric", "2021"),
        raw_paper("shared  title", "doaj", "2021"),
        raw_paper("Shared Title", "eric", "2019"),
    ];

    let merged = pipeline(papers, &SearchQuery::default());
    let mut keys: Vec<String> = merged.iter().map(identity_key).collect();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), merged.len());
}

#[test]
fn test_pipeline_is_permutation_independent_for_every_sort_order() {
    let mut base = Vec::new();
    for (name, year) in [("alpha", "2021"), ("bravo", "2019"), ("charlie", "n.d.")] {
        for source in ["eric", "doaj", "openalex"] {
            let mut p = raw_paper(&format!("{name} retention study"), source, year);
            p.citation_count = Some(u32::try_from(name.len()).unwrap());
            base.push(p);
        }
    }

    for sort_by in [
        SortBy::Relevance,
        SortBy::Newest,
        SortBy::Oldest,
        SortBy::Citations,
    ] {
        let query = SearchQuery {
            query: "retention study".to_string(),
            sort_by,
            ..SearchQuery::default()
        };

        let forward = pipeline(base.clone(), &query);
        let reversed = pipeline(base.iter().rev().cloned().collect(), &query);
        let mut rotated = base.clone();
        rotated.rotate_left(4);
        let rotated = pipeline(rotated, &query);

        assert_eq!(forward, reversed, "order unstable under reversal ({sort_by})");
        assert_eq!(forward, rotated, "order unstable under rotation ({sort_by})");
    }
}

#[test]
fn test_result_set_survives_serialization_in_ranked_order() {
    let mut papers = vec![
        raw_paper("Zeta Findings", "eric", "2017"),
        raw_paper("Alpha Findings", "doaj", "2022"),
        raw_paper("Mid Findings", "openalex", "2019"),
    ];
    rank(
        &mut papers,
        &SearchQuery {
            sort_by: SortBy::Newest,
            ..SearchQuery::default()
        },
    );

    let set = AggregatedResultSet {
        papers,
        sources_queried: vec!["eric".to_string(), "doaj".to_string(), "openalex".to_string()],
        source_status: BTreeMap::new(),
    };

    // Cached sets replay stored order exactly
    let json = serde_json::to_string(&set).unwrap();
    let restored: AggregatedResultSet = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, set);
    assert_eq!(restored.papers[0].title, "Alpha Findings");
    assert_eq!(restored.papers[2].title, "Zeta Findings");
}

//! Identity-key deduplication of the merged result set.
//!
//! Records sharing an identity key (same DOI, or same normalized title
//! plus year) collapse into one. The representative comes from the
//! highest-priority source in the group; fields the representative lacks
//! are back-filled from the other members in priority order, and the
//! record is annotated with every contributing source.

use crate::client::{NormalizedPaper, YEAR_UNKNOWN};
use crate::services::normalize::identity_key;
use std::collections::HashMap;

/// Merges duplicates across sources. `priority` is the configured source
/// order, most complete metadata first; sources absent from the list rank
/// after all listed ones. Output is deterministic under any permutation
/// of the input.
#[must_use]
pub fn deduplicate(papers: Vec<NormalizedPaper>, priority: &[String]) -> Vec<NormalizedPaper> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<NormalizedPaper>> = HashMap::new();

    for paper in papers {
        let key = identity_key(&paper);
        let group = groups.entry(key.clone()).or_default();
        if group.is_empty() {
            order.push(key);
        }
        group.push(paper);
    }

    order
        .into_iter()
        .filter_map(|key| groups.remove(&key))
        .filter_map(|group| merge_group(group, priority))
        .collect()
}

fn priority_rank(source: &str, priority: &[String]) -> usize {
    priority
        .iter()
        .position(|p| p == source)
        .unwrap_or(priority.len())
}

fn merge_group(mut group: Vec<NormalizedPaper>, priority: &[String]) -> Option<NormalizedPaper> {
    // Priority order first, then name and title so equal-priority members
    // merge the same way regardless of arrival order.
    group.sort_by(|a, b| {
        priority_rank(&a.source, priority)
            .cmp(&priority_rank(&b.source, priority))
            .then_with(|| a.source.cmp(&b.source))
            .then_with(|| a.title.cmp(&b.title))
    });

    let mut members = group.into_iter();
    let mut winner = members.next()?;

    let mut merged_from = vec![winner.source.clone()];

    for member in members {
        if winner.abstract_text.is_none() {
            winner.abstract_text = member.abstract_text.clone();
        }
        if winner.doi.is_none() {
            winner.doi = member.doi.clone();
        }
        if winner.full_text_url.is_none() {
            winner.full_text_url = member.full_text_url.clone();
        }
        if winner.journal.is_none() {
            winner.journal = member.journal.clone();
        }
        if winner.citation_count.is_none() {
            winner.citation_count = member.citation_count;
        }
        if winner.authors.is_empty() {
            winner.authors = member.authors.clone();
        }
        if winner.year == YEAR_UNKNOWN && member.year_number().is_some() {
            winner.year = member.year.clone();
        }
        if !merged_from.contains(&member.source) {
            merged_from.push(member.source);
        }
    }

    winner.merged_from = merged_from;
    Some(winner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(title: &str, source: &str, doi: Option<&str>) -> NormalizedPaper {
        let mut p = NormalizedPaper::new(title, source);
        p.year = "2021".to_string();
        p.doi = doi.map(str::to_string);
        p
    }

    fn priority() -> Vec<String> {
        vec!["crossref".to_string(), "eric".to_string(), "doaj".to_string()]
    }

    #[test]
    fn test_merges_same_doi() {
        let papers = vec![
            paper("Title A", "doaj", Some("10.1/x")),
            paper("Different casing of title a", "eric", Some("10.1/x")),
        ];
        let merged = deduplicate(papers, &priority());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].source, "eric");
        assert_eq!(merged[0].merged_from, vec!["eric", "doaj"]);
    }

    #[test]
    fn test_merges_same_title_and_year_without_doi() {
        let papers = vec![
            paper("Early Literacy: A Review", "doaj", None),
            paper("early literacy   a review", "eric", None),
        ];
        let merged = deduplicate(papers, &priority());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].source, "eric");
    }

    #[test]
    fn test_distinct_keys_stay_separate() {
        let papers = vec![
            paper("Title A", "eric", Some("10.1/a")),
            paper("Title A", "doaj", Some("10.1/b")),
        ];
        let merged = deduplicate(papers, &priority());
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_back_fills_missing_fields_in_priority_order() {
        let mut winner = paper("Title", "crossref", Some("10.1/x"));
        winner.citation_count = Some(12);

        let mut second = paper("Title", "eric", Some("10.1/x"));
        second.abstract_text = Some("From ERIC".to_string());
        second.citation_count = Some(99);

        let mut third = paper("Title", "doaj", Some("10.1/x"));
        third.abstract_text = Some("From DOAJ".to_string());
        third.full_text_url = Some("https://doaj.org/a/x.pdf".to_string());

        let merged = deduplicate(vec![third, winner, second], &priority());
        assert_eq!(merged.len(), 1);
        let result = &merged[0];
        assert_eq!(result.source, "crossref");
        // First non-empty value in priority order wins; the winner's own
        // fields are never overwritten
        assert_eq!(result.abstract_text.as_deref(), Some("From ERIC"));
        assert_eq!(result.citation_count, Some(12));
        assert_eq!(
            result.full_text_url.as_deref(),
            Some("https://doaj.org/a/x.pdf")
        );
        assert_eq!(result.merged_from, vec!["crossref", "eric", "doaj"]);
    }

    #[test]
    fn test_back_fills_year() {
        let mut undated = paper("Title", "crossref", Some("10.1/x"));
        undated.year = YEAR_UNKNOWN.to_string();
        let dated = paper("Title", "eric", Some("10.1/x"));

        let merged = deduplicate(vec![undated, dated], &priority());
        assert_eq!(merged[0].year, "2021");
    }

    #[test]
    fn test_unlisted_source_ranks_last() {
        let listed = paper("Title", "doaj", Some("10.1/x"));
        let unlisted = paper("Title", "openalex", Some("10.1/x"));

        let merged = deduplicate(vec![unlisted, listed], &priority());
        assert_eq!(merged[0].source, "doaj");
    }

    #[test]
    fn test_deterministic_under_permutation() {
        let a = paper("Title", "eric", Some("10.1/x"));
        let b = paper("Title", "doaj", Some("10.1/x"));
        let c = paper("Other Work", "crossref", Some("10.2/y"));

        let forward = deduplicate(vec![a.clone(), b.clone(), c.clone()], &priority());
        let mut backward = deduplicate(vec![c, b, a], &priority());

        // Output order differs by arrival; contents must not
        backward.reverse();
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_no_duplicate_identity_keys_in_output() {
        let papers = vec![
            paper("Title A", "eric", Some("10.1/x")),
            paper("Title A", "doaj", Some("10.1/x")),
            paper("Title B", "eric", None),
            paper("title b", "doaj", None),
            paper("Title C", "core", None),
        ];
        let merged = deduplicate(papers, &priority());
        let mut keys: Vec<String> = merged.iter().map(identity_key).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), merged.len());
    }
}

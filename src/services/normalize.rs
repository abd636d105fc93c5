//! Field sanitization and canonical normalization.
//!
//! This is the single point where text from external providers becomes
//! trusted: HTML is stripped, control characters removed, whitespace
//! collapsed, and lengths capped before a record can reach deduplication,
//! ranking, caching, or a caller. Also home of the identity key that
//! decides when two records describe the same paper.

use crate::client::{Doi, NormalizedPaper, YEAR_UNKNOWN};

/// Length caps applied to sanitized fields, in characters.
const MAX_TITLE_CHARS: usize = 500;
const MAX_ABSTRACT_CHARS: usize = 5000;
const MAX_AUTHOR_CHARS: usize = 200;
const MAX_JOURNAL_CHARS: usize = 300;
/// Author lists beyond this are truncated (consortium papers).
const MAX_AUTHORS: usize = 50;

/// Strips markup and normalizes whitespace in one provider-supplied string.
///
/// Tags are replaced by a space so `<p>a</p><p>b</p>` keeps its word
/// boundary, the handful of entities providers actually emit are decoded,
/// and control characters are dropped.
#[must_use]
pub fn sanitize_text(input: &str) -> String {
    let mut stripped = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        if in_tag {
            if c == '>' {
                in_tag = false;
                stripped.push(' ');
            }
            continue;
        }
        match c {
            '<' => in_tag = true,
            c if c.is_whitespace() => stripped.push(' '),
            c if c.is_control() => {}
            c => stripped.push(c),
        }
    }

    let decoded = stripped
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ");

    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cleans caller-supplied query text: control characters dropped,
/// whitespace collapsed. Unlike [`sanitize_text`] this keeps `<` and
/// `>`, which are legitimate in search terms.
#[must_use]
pub fn sanitize_query_text(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .filter(|c| !c.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn truncate_chars(input: String, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input;
    }
    input.chars().take(max_chars).collect()
}

fn sanitize_capped(input: &str, max_chars: usize) -> String {
    truncate_chars(sanitize_text(input), max_chars)
}

/// Canonical DOI form: trimmed, lower-cased, URL/scheme prefix stripped.
/// Returns `None` for anything that is not a plausible DOI.
#[must_use]
pub fn normalize_doi(raw: &str) -> Option<String> {
    Doi::new(raw).ok().map(|doi| doi.as_str().to_string())
}

/// Extracts a publication year from free text (`"2021-03-04"`,
/// `"March 2021"`, `"c2021."`). Returns the canonical year string or
/// `None` when no plausible year appears.
#[must_use]
pub fn year_from_text(raw: &str) -> Option<String> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i - start == 4 {
                let candidate = &raw[start..i];
                if let Ok(year) = candidate.parse::<u16>() {
                    if (1000..=2100).contains(&year) {
                        return Some(candidate.to_string());
                    }
                }
            }
        } else {
            i += 1;
        }
    }
    None
}

/// Year string from an already-parsed numeric year.
#[must_use]
pub fn year_string(year: Option<u16>) -> String {
    match year {
        Some(y) if (1000..=2100).contains(&y) => y.to_string(),
        _ => YEAR_UNKNOWN.to_string(),
    }
}

/// Case-folded, punctuation-stripped, whitespace-collapsed title used in
/// the identity key.
#[must_use]
pub fn normalized_title_key(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// The value that decides whether two records describe the same work:
/// the canonical DOI when present, otherwise normalized title plus year.
#[must_use]
pub fn identity_key(paper: &NormalizedPaper) -> String {
    match &paper.doi {
        Some(doi) if !doi.is_empty() => format!("doi:{doi}"),
        _ => format!(
            "title:{}:{}",
            normalized_title_key(&paper.title),
            paper.year
        ),
    }
}

/// Runs the full trust boundary over one adapter-produced record.
///
/// Returns `None` when the record is unusable (no title survives
/// sanitization). Everything else comes back capped, stripped, and in
/// canonical form.
#[must_use]
pub fn sanitize_paper(paper: NormalizedPaper) -> Option<NormalizedPaper> {
    let title = sanitize_capped(&paper.title, MAX_TITLE_CHARS);
    if title.is_empty() {
        return None;
    }

    let authors: Vec<String> = paper
        .authors
        .iter()
        .map(|a| sanitize_capped(a, MAX_AUTHOR_CHARS))
        .filter(|a| !a.is_empty())
        .take(MAX_AUTHORS)
        .collect();

    let abstract_text = paper
        .abstract_text
        .as_deref()
        .map(|a| sanitize_capped(a, MAX_ABSTRACT_CHARS))
        .filter(|a| !a.is_empty());

    let journal = paper
        .journal
        .as_deref()
        .map(|j| sanitize_capped(j, MAX_JOURNAL_CHARS))
        .filter(|j| !j.is_empty());

    let doi = paper.doi.as_deref().and_then(normalize_doi);

    let full_text_url = paper.full_text_url.as_deref().and_then(valid_http_url);

    let year = if paper.year_number().is_some() {
        paper.year.clone()
    } else {
        year_from_text(&paper.year).unwrap_or_else(|| YEAR_UNKNOWN.to_string())
    };

    Some(NormalizedPaper {
        title,
        authors,
        abstract_text,
        year,
        source: paper.source,
        doi,
        full_text_url,
        journal,
        citation_count: paper.citation_count,
        merged_from: paper.merged_from,
    })
}

/// Accepts only parseable absolute http(s) URLs.
fn valid_http_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let parsed = url::Url::parse(trimmed).ok()?;
    match parsed.scheme() {
        "http" | "https" => Some(trimmed.to_string()),
        _ => None,
    }
}

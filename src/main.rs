#![allow(clippy::struct_excessive_bools)]

use anyhow::Result;
use clap::Parser;
use paper_search_engine::{
    Aggregator, Config, ConfigOverrides, SearchQuery, SearchResponse, SortBy,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "paper-search-engine")]
#[command(about = "Federated search across academic paper sources")]
#[command(version)]
struct Cli {
    /// Search query text (free text, or a bare DOI for a single-paper lookup)
    #[arg(short, long)]
    query: Option<String>,

    /// Earliest publication year, inclusive
    #[arg(long)]
    year_start: Option<u16>,

    /// Latest publication year, inclusive
    #[arg(long)]
    year_end: Option<u16>,

    /// Subject area filter, provider vocabulary permitting
    #[arg(long)]
    discipline: Option<String>,

    /// Education level filter (e.g. "higher education")
    #[arg(long)]
    education_level: Option<String>,

    /// Publication type filter (e.g. "journal article")
    #[arg(long)]
    publication_type: Option<String>,

    /// Study type filter (e.g. "randomized controlled trial")
    #[arg(long)]
    study_type: Option<String>,

    /// Minimum citation count
    #[arg(long)]
    min_citations: Option<u32>,

    /// Sort order: relevance, newest, oldest, citations
    #[arg(long, default_value = "relevance")]
    sort_by: String,

    /// Result page, 0-based
    #[arg(long, default_value_t = 0)]
    page: u32,

    /// Results per page
    #[arg(long, default_value_t = 20)]
    per_page: u32,

    /// Comma-separated subset of sources to query (default: all enabled)
    #[arg(long, value_delimiter = ',')]
    sources: Option<Vec<String>>,

    /// Per-source API key as SOURCE=KEY; repeatable. Also read from
    /// PSE_CREDENTIALS as a comma-separated list.
    #[arg(
        long = "credential",
        value_name = "SOURCE=KEY",
        value_delimiter = ',',
        env = "PSE_CREDENTIALS",
        hide_env_values = true
    )]
    credentials: Vec<String>,

    /// List available sources and their capabilities
    #[arg(long)]
    list_sources: bool,

    /// Probe every source for availability
    #[arg(long)]
    check_sources: bool,

    /// Print an example configuration file
    #[arg(long)]
    generate_config: bool,

    /// Print the JSON schema of the search response
    #[arg(long)]
    generate_schema: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Override log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Set environment profile (development, production)
    #[arg(long)]
    profile: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Artifact-printing modes need no configuration
    if cli.generate_schema {
        let schema = schemars::schema_for!(SearchResponse);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }
    if cli.generate_config {
        print!("{}", Config::generate_example_config());
        return Ok(());
    }

    let overrides = ConfigOverrides {
        log_level: cli
            .log_level
            .clone()
            .or_else(|| cli.verbose.then(|| "debug".to_string())),
        profile: cli.profile.clone(),
        cache_url: None,
        search_deadline_secs: None,
    };
    let config = Config::load_with_overrides(cli.config.as_deref(), &overrides)?;

    init_tracing(&config)?;
    info!(
        profile = %config.profile,
        schema_version = %config.schema_version,
        "configuration loaded"
    );

    let aggregator = Aggregator::new(Arc::new(config))?;

    if cli.list_sources {
        print_source_listing(&aggregator);
        return Ok(());
    }

    if cli.check_sources {
        for (name, healthy) in aggregator.health_check().await {
            println!(
                "{name}: {}",
                if healthy { "available" } else { "unavailable" }
            );
        }
        return Ok(());
    }

    let Some(query_text) = cli.query else {
        anyhow::bail!(
            "--query is required (or use --list-sources, --check-sources, \
             --generate-config, --generate-schema)"
        );
    };

    let query = SearchQuery {
        query: query_text,
        year_start: cli.year_start,
        year_end: cli.year_end,
        discipline: cli.discipline,
        education_level: cli.education_level,
        publication_type: cli.publication_type,
        study_type: cli.study_type,
        min_citations: cli.min_citations,
        sort_by: cli.sort_by.parse::<SortBy>().map_err(anyhow::Error::msg)?,
        page: cli.page,
        per_page: cli.per_page,
        sources: cli.sources,
        credentials: parse_credentials(&cli.credentials)?,
    };

    match aggregator.search(&query).await {
        Ok(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(e) => {
            error!(kind = e.kind(), "search failed: {e}");
            Err(e.into())
        }
    }
}

/// Installs the global subscriber from the resolved logging configuration.
/// `RUST_LOG` wins when set; otherwise the configured level applies.
fn init_tracing(config: &Config) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.log_file_path() {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)?;
            let builder = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Arc::new(file));
            if config.logging.format == "json" {
                tracing::subscriber::set_global_default(builder.json().finish())?;
            } else {
                tracing::subscriber::set_global_default(builder.finish())?;
            }
        }
        None => {
            let builder = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr);
            if config.logging.format == "json" {
                tracing::subscriber::set_global_default(builder.json().finish())?;
            } else {
                tracing::subscriber::set_global_default(builder.finish())?;
            }
        }
    }
    Ok(())
}

fn print_source_listing(aggregator: &Aggregator) {
    println!(
        "{:<18} {:<8} {:>11}  {:<28} DESCRIPTION",
        "SOURCE", "KEY REQ", "INTERVAL MS", "QUERY SYNTAX"
    );
    for descriptor in aggregator.descriptors() {
        println!(
            "{:<18} {:<8} {:>11}  {:<28} {}",
            descriptor.name,
            if descriptor.requires_credential {
                "yes"
            } else {
                "no"
            },
            descriptor.min_interval.as_millis(),
            descriptor.query_syntax,
            descriptor.description,
        );
    }
}

/// Parses repeated `SOURCE=KEY` pairs. Keys are never echoed back, logged,
/// or stored beyond the request being built.
fn parse_credentials(entries: &[String]) -> Result<HashMap<String, String>> {
    let mut credentials = HashMap::new();
    for entry in entries {
        let Some((source, key)) = entry.split_once('=') else {
            anyhow::bail!("invalid --credential value (expected SOURCE=KEY)");
        };
        let source = source.trim().to_lowercase();
        if source.is_empty() || key.is_empty() {
            anyhow::bail!("invalid --credential value (expected SOURCE=KEY)");
        }
        credentials.insert(source, key.to_string());
    }
    Ok(credentials)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_credentials() {
        let parsed = parse_credentials(&[
            "core=abc123".to_string(),
            "Semantic_Scholar=xyz".to_string(),
        ])
        .unwrap();
        assert_eq!(parsed.get("core").map(String::as_str), Some("abc123"));
        assert_eq!(
            parsed.get("semantic_scholar").map(String::as_str),
            Some("xyz")
        );
    }

    #[test]
    fn test_parse_credentials_rejects_malformed() {
        assert!(parse_credentials(&["no-separator".to_string()]).is_err());
        assert!(parse_credentials(&["=keyonly".to_string()]).is_err());
        assert!(parse_credentials(&["source=".to_string()]).is_err());
    }

    #[test]
    fn test_credential_flag_splits_on_commas() {
        let cli = Cli::parse_from([
            "paper-search-engine",
            "--query",
            "q",
            "--credential",
            "core=abc,pubmed=xyz",
        ]);
        assert_eq!(cli.credentials, vec!["core=abc", "pubmed=xyz"]);
    }

    #[test]
    fn test_cli_parses_search_flags() {
        let cli = Cli::parse_from([
            "paper-search-engine",
            "--query",
            "retrieval practice",
            "--year-start",
            "2019",
            "--year-end",
            "2024",
            "--sort-by",
            "newest",
            "--sources",
            "eric,openalex",
            "--per-page",
            "50",
        ]);
        assert_eq!(cli.query.as_deref(), Some("retrieval practice"));
        assert_eq!(cli.year_start, Some(2019));
        assert_eq!(cli.year_end, Some(2024));
        assert_eq!(cli.sort_by, "newest");
        assert_eq!(
            cli.sources,
            Some(vec!["eric".to_string(), "openalex".to_string()])
        );
        assert_eq!(cli.per_page, 50);
    }
}

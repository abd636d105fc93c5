pub mod arxiv;
pub mod core;
pub mod crossref;
pub mod doaj;
pub mod eric;
pub mod google_books;
pub mod google_scholar;
pub mod openalex;
pub mod pubmed;
pub mod semantic_scholar;
pub mod traits;

pub use arxiv::ArxivAdapter;
pub use core::CoreAdapter;
pub use crossref::CrossrefAdapter;
pub use doaj::DoajAdapter;
pub use eric::EricAdapter;
pub use google_books::GoogleBooksAdapter;
pub use google_scholar::GoogleScholarAdapter;
pub use openalex::OpenAlexAdapter;
pub use pubmed::PubMedAdapter;
pub use semantic_scholar::SemanticScholarAdapter;
pub use traits::{
    apply_post_filters, AdapterError, QueryCapability, SearchContext, SearchQuery, SortBy,
    SourceAdapter, SourceDescriptor, SourceStatus,
};

use crate::client::{HttpClientConfig, SecureHttpClientFactory};
use crate::config::Config;
use std::sync::Arc;

/// Every adapter this build knows about, in default dispatch order.
pub const SOURCE_NAMES: [&str; 10] = [
    "eric",
    "core",
    "doaj",
    "crossref",
    "openalex",
    "semantic_scholar",
    "pubmed",
    "arxiv",
    "google_books",
    "google_scholar",
];

/// Construct the enabled adapters from configuration, sharing one
/// pooled HTTP client and applying any per-source endpoint overrides.
pub fn build_adapters(config: &Config) -> crate::Result<Vec<Arc<dyn SourceAdapter>>> {
    let http_config = HttpClientConfig {
        allow_http: config.any_http_endpoint(),
        ..HttpClientConfig::default()
    };
    let client = SecureHttpClientFactory::create_client(&http_config)?;

    let mut adapters: Vec<Arc<dyn SourceAdapter>> =
        Vec::with_capacity(config.sources.enabled.len());
    for name in &config.sources.enabled {
        let endpoint = config.sources.endpoints.get(name).cloned();
        adapters.push(build_adapter(name, client.clone(), endpoint)?);
    }
    Ok(adapters)
}

fn build_adapter(
    name: &str,
    client: reqwest::Client,
    endpoint: Option<String>,
) -> crate::Result<Arc<dyn SourceAdapter>> {
    let adapter: Arc<dyn SourceAdapter> = match name {
        "eric" => Arc::new(EricAdapter::new(client, endpoint)),
        "core" => Arc::new(CoreAdapter::new(client, endpoint)),
        "doaj" => Arc::new(DoajAdapter::new(client, endpoint)),
        "crossref" => Arc::new(CrossrefAdapter::new(client, endpoint)),
        "openalex" => Arc::new(OpenAlexAdapter::new(client, endpoint)),
        "semantic_scholar" => Arc::new(SemanticScholarAdapter::new(client, endpoint)),
        "pubmed" => Arc::new(PubMedAdapter::new(client, endpoint)),
        "arxiv" => Arc::new(ArxivAdapter::new(client, endpoint)),
        "google_books" => Arc::new(GoogleBooksAdapter::new(client, endpoint)),
        "google_scholar" => Arc::new(GoogleScholarAdapter::new(client, endpoint)),
        other => {
            return Err(crate::Error::InvalidInput {
                field: "sources".to_string(),
                reason: format!("Unknown source '{other}'. Available: {SOURCE_NAMES:?}"),
            })
        }
    };
    Ok(adapter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_adapters_covers_default_roster() {
        let config = Config::default();
        let adapters = build_adapters(&config).expect("default roster builds");
        assert_eq!(adapters.len(), SOURCE_NAMES.len());
        for (adapter, name) in adapters.iter().zip(SOURCE_NAMES.iter()) {
            assert_eq!(adapter.name(), *name);
            assert_eq!(adapter.descriptor().name, *name);
        }
    }

    #[test]
    fn test_build_adapters_respects_enabled_subset() {
        let mut config = Config::default();
        config.sources.enabled = vec!["doaj".to_string(), "eric".to_string()];
        let adapters = build_adapters(&config).expect("subset builds");
        assert_eq!(adapters.len(), 2);
        assert_eq!(adapters[0].name(), "doaj");
        assert_eq!(adapters[1].name(), "eric");
    }

    #[test]
    fn test_build_adapter_rejects_unknown_name() {
        let result = build_adapter("library_of_babel", reqwest::Client::new(), None);
        assert!(matches!(result, Err(crate::Error::InvalidInput { .. })));
    }

    #[test]
    fn test_exactly_one_adapter_requires_credential() {
        let config = Config::default();
        let adapters = build_adapters(&config).expect("default roster builds");
        let gated: Vec<&str> = adapters
            .iter()
            .filter(|a| a.descriptor().requires_credential)
            .map(|a| a.descriptor().name)
            .collect();
        assert_eq!(gated, vec!["core"]);
    }
}

//! Paper Search Engine - Federated Academic Search Aggregation
//!
//! This crate answers one canonical search query by fanning out concurrently to
//! heterogeneous academic sources (`ERIC`, `CORE`, `DOAJ`, `Crossref`, `OpenAlex`,
//! `Semantic Scholar`, `PubMed`, `arXiv`, `Google Books`, `Google Scholar`),
//! tolerating per-source failure, and merging everything that arrives into one
//! deduplicated, ranked, cached result set.

#![allow(clippy::cognitive_complexity)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::single_match_else)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_self)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::map_unwrap_or)]
#![allow(clippy::if_not_else)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::struct_field_names)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::used_underscore_binding)]
#![allow(clippy::field_reassign_with_default)]

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod services;

pub use client::providers::{SearchQuery, SortBy, SourceStatus};
pub use client::{AggregatedResultSet, Aggregator, Doi, NormalizedPaper, SearchResponse};
pub use config::{Config, ConfigOverrides};
pub use error::{Error, Result};

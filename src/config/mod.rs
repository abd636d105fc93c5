use config;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, warn};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Config {
    /// Search orchestration configuration
    pub search: SearchConfig,
    /// Result cache configuration
    pub cache: CacheConfig,
    /// Source adapter configuration
    pub sources: SourcesConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Environment profile (development, production)
    #[serde(default = "default_profile")]
    pub profile: String,
    /// Configuration schema version
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum adapter calls in flight at once per search
    pub max_concurrent_sources: usize,
    /// Per-adapter call timeout in seconds
    pub source_timeout_secs: u64,
    /// Overall search deadline in seconds
    pub search_deadline_secs: u64,
    /// Upper bound callers may request for per_page
    pub max_per_page: u32,
    /// Maximum accepted query length in characters
    pub max_query_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CacheConfig {
    /// Shared cache service base URL; unset means in-process only
    pub remote_url: Option<String>,
    /// TTL for broad searches in seconds
    pub broad_ttl_secs: u64,
    /// TTL for single-paper (DOI) lookups in seconds
    pub lookup_ttl_secs: u64,
    /// Entry bound for the in-process tier
    pub max_entries: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SourcesConfig {
    /// Adapters available to searches, in dispatch order
    pub enabled: Vec<String>,
    /// Dedup winner order, most complete metadata first
    pub priority: Vec<String>,
    /// Per-source base URL overrides (self-hosted mirrors, tests)
    pub endpoints: HashMap<String, String>,
    /// Per-source minimum call interval overrides in milliseconds
    pub min_interval_ms: HashMap<String, u64>,
    /// Minimum call interval for sources without an override or a
    /// descriptor default, in milliseconds
    pub default_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, text)
    pub format: String,
    /// Optional log file path
    pub file: Option<PathBuf>,
}

fn default_profile() -> String {
    "development".to_string()
}

fn default_schema_version() -> String {
    "1.0".to_string()
}

/// Expand tilde and environment variables in paths
#[allow(clippy::option_if_let_else)]
fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        dirs::home_dir().map_or_else(|| PathBuf::from(path), |home_dir| home_dir.join(stripped))
    } else if path.starts_with('$') {
        path.find('/').map_or_else(
            || PathBuf::from(path),
            |separator| {
                let env_var = &path[1..separator];
                std::env::var(env_var).map_or_else(
                    |_| PathBuf::from(path),
                    |env_value| PathBuf::from(env_value).join(&path[separator + 1..]),
                )
            },
        )
    } else {
        PathBuf::from(path)
    }
}

/// CLI argument overrides for configuration
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub profile: Option<String>,
    pub cache_url: Option<String>,
    pub search_deadline_secs: Option<u64>,
}

/// Environment variable overrides with PSE_ prefix
#[derive(Debug, Deserialize)]
pub struct ConfigEnvOverrides {
    #[serde(rename = "log_level")]
    pub log_level: Option<String>,
    #[serde(rename = "profile")]
    pub profile: Option<String>,
    #[serde(rename = "cache_url")]
    pub cache_url: Option<String>,
    #[serde(rename = "search_deadline_secs")]
    pub search_deadline_secs: Option<u64>,
    #[serde(rename = "max_concurrent_sources")]
    pub max_concurrent_sources: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search: SearchConfig::default(),
            cache: CacheConfig::default(),
            sources: SourcesConfig::default(),
            logging: LoggingConfig::default(),
            profile: default_profile(),
            schema_version: default_schema_version(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sources: 4,
            source_timeout_secs: 10,
            search_deadline_secs: 25,
            max_per_page: 100,
            max_query_length: 512,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            remote_url: None,
            broad_ttl_secs: 600,
            lookup_ttl_secs: 86_400,
            max_entries: 512,
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            enabled: crate::client::providers::SOURCE_NAMES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            priority: [
                "crossref",
                "openalex",
                "semantic_scholar",
                "pubmed",
                "eric",
                "doaj",
                "core",
                "arxiv",
                "google_books",
                "google_scholar",
            ]
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
            endpoints: HashMap::new(),
            min_interval_ms: HashMap::new(),
            default_interval_ms: 1000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration with layered precedence: defaults < file < env vars < CLI args
    pub fn load() -> crate::Result<Self> {
        Self::load_with_overrides(None, &ConfigOverrides::default())
    }

    /// Load configuration from a specific file path
    pub fn load_from_file(file_path: &std::path::Path) -> crate::Result<Self> {
        Self::load_with_overrides(Some(file_path), &ConfigOverrides::default())
    }

    /// Load configuration with CLI overrides
    pub fn load_with_overrides(
        config_path: Option<&std::path::Path>,
        overrides: &ConfigOverrides,
    ) -> crate::Result<Self> {
        debug!("Loading configuration with layered approach");

        // 1. Start with defaults
        let mut config = Self::default();

        // 2. Load from file (if exists)
        if let Some(path) = config_path {
            if path.exists() {
                config = Self::load_from_toml_file(path)?;
                debug!("Loaded configuration from file: {}", path.display());
            } else {
                warn!("Configuration file not found: {}", path.display());
            }
        } else if let Some(standard_config) = Self::try_load_standard_locations()? {
            config = standard_config;
            debug!("Loaded configuration from standard location");
        }

        // 3. Override with environment variables
        config = Self::apply_env_overrides(config);

        // 4. Apply CLI overrides
        config = Self::apply_cli_overrides(config, overrides);

        // 5. Apply profile-specific settings
        config = Self::apply_profile_settings(config);

        // 6. Validate final configuration
        config.validate()?;
        debug!("Configuration validation passed");

        Ok(config)
    }

    /// Load configuration from a TOML file
    fn load_from_toml_file(path: &std::path::Path) -> crate::Result<Self> {
        Self::validate_config_file_security(path)?;

        let config_str = std::fs::read_to_string(path)?;
        toml::from_str(&config_str)
            .map_err(|e| crate::Error::Config(config::ConfigError::Foreign(Box::new(e))))
    }

    /// Try to load from standard configuration locations
    fn try_load_standard_locations() -> crate::Result<Option<Self>> {
        let Some(config_root) = dirs::config_dir() else {
            return Ok(None);
        };
        let config_dir = config_root.join("paper-search-engine");

        let config_files = [
            config_dir.join("config.toml"),
            config_dir.join("config.development.toml"),
            config_dir.join("config.production.toml"),
        ];

        for config_file in &config_files {
            if config_file.exists() {
                debug!("Found config file: {}", config_file.display());
                return Ok(Some(Self::load_from_toml_file(config_file)?));
            }
        }

        Ok(None)
    }

    /// Apply environment variable overrides using the PSE_ prefix
    fn apply_env_overrides(mut config: Self) -> Self {
        match envy::prefixed("PSE_").from_env::<ConfigEnvOverrides>() {
            Ok(env_overrides) => {
                if let Some(level) = env_overrides.log_level {
                    let valid_levels = ["trace", "debug", "info", "warn", "error"];
                    if valid_levels.contains(&level.as_str()) {
                        config.logging.level.clone_from(&level);
                        debug!("Overrode log level from env: {}", level);
                    } else {
                        warn!("Invalid log level from env: {}, ignoring", level);
                    }
                }

                if let Some(profile) = env_overrides.profile {
                    config.profile.clone_from(&profile);
                    debug!("Overrode profile from env: {}", profile);
                }

                if let Some(url) = env_overrides.cache_url {
                    if url.trim().is_empty() {
                        warn!("Empty cache URL from env, ignoring");
                    } else {
                        config.cache.remote_url = Some(url);
                    }
                }

                if let Some(deadline) = env_overrides.search_deadline_secs {
                    if deadline > 0 {
                        config.search.search_deadline_secs = deadline;
                    } else {
                        warn!("Invalid search deadline from env: {}, ignoring", deadline);
                    }
                }

                if let Some(concurrency) = env_overrides.max_concurrent_sources {
                    if concurrency > 0 {
                        config.search.max_concurrent_sources = concurrency;
                    } else {
                        warn!("Invalid concurrency from env: {}, ignoring", concurrency);
                    }
                }
            }
            Err(e) => {
                debug!("No valid environment variable overrides found: {}", e);
            }
        }

        config
    }

    /// Apply CLI argument overrides
    fn apply_cli_overrides(mut config: Self, overrides: &ConfigOverrides) -> Self {
        if let Some(ref level) = overrides.log_level {
            config.logging.level.clone_from(level);
            debug!("Overrode log level from CLI: {}", level);
        }

        if let Some(ref profile) = overrides.profile {
            config.profile.clone_from(profile);
            debug!("Overrode profile from CLI: {}", profile);
        }

        if let Some(ref url) = overrides.cache_url {
            config.cache.remote_url = Some(url.clone());
            debug!("Overrode cache URL from CLI: {}", url);
        }

        if let Some(deadline) = overrides.search_deadline_secs {
            config.search.search_deadline_secs = deadline;
            debug!("Overrode search deadline from CLI: {}s", deadline);
        }

        config
    }

    /// Apply profile-specific configuration adjustments
    fn apply_profile_settings(mut config: Self) -> Self {
        match config.profile.as_str() {
            "development" => {
                if config.logging.level == "info" {
                    config.logging.level = "debug".to_string();
                }
            }
            "production" => {
                config.logging.format = "json".to_string();
            }
            _ => {
                warn!("Unknown profile '{}', using defaults", config.profile);
            }
        }

        config
    }

    /// Generate JSON schema for configuration
    #[must_use]
    pub fn generate_schema() -> serde_json::Value {
        let schema = schemars::schema_for!(Self);
        serde_json::to_value(schema).unwrap_or_default()
    }

    pub fn validate(&self) -> crate::Result<()> {
        // Validate schema version (allow forward compatibility)
        let supported_versions = ["1.0"];
        if !supported_versions.contains(&self.schema_version.as_str()) {
            warn!(
                "Unknown config schema version: {}. Supported: {:?}. Attempting to continue...",
                self.schema_version, supported_versions
            );
        }

        // Validate search configuration
        if self.search.max_concurrent_sources == 0 {
            return Err(crate::Error::InvalidInput {
                field: "search.max_concurrent_sources".to_string(),
                reason: "Concurrency bound must be greater than 0".to_string(),
            });
        }
        if self.search.source_timeout_secs == 0 {
            return Err(crate::Error::InvalidInput {
                field: "search.source_timeout_secs".to_string(),
                reason: "Source timeout must be greater than 0".to_string(),
            });
        }
        if self.search.search_deadline_secs == 0 {
            return Err(crate::Error::InvalidInput {
                field: "search.search_deadline_secs".to_string(),
                reason: "Search deadline must be greater than 0".to_string(),
            });
        }
        if self.search.search_deadline_secs < self.search.source_timeout_secs {
            warn!(
                "Search deadline ({}s) is shorter than the per-source timeout ({}s); \
                the deadline will dominate",
                self.search.search_deadline_secs, self.search.source_timeout_secs
            );
        }
        if self.search.max_per_page == 0 || self.search.max_per_page > 500 {
            return Err(crate::Error::InvalidInput {
                field: "search.max_per_page".to_string(),
                reason: "Page size bound must be between 1 and 500".to_string(),
            });
        }
        if self.search.max_query_length < 16 {
            return Err(crate::Error::InvalidInput {
                field: "search.max_query_length".to_string(),
                reason: "Query length bound must be at least 16".to_string(),
            });
        }

        // Validate cache configuration
        if self.cache.broad_ttl_secs == 0 || self.cache.lookup_ttl_secs == 0 {
            return Err(crate::Error::InvalidInput {
                field: "cache.ttl".to_string(),
                reason: "Cache TTLs must be greater than 0".to_string(),
            });
        }
        if self.cache.max_entries == 0 {
            return Err(crate::Error::InvalidInput {
                field: "cache.max_entries".to_string(),
                reason: "Cache entry bound must be greater than 0".to_string(),
            });
        }
        if let Some(ref url) = self.cache.remote_url {
            let parsed = url::Url::parse(url).map_err(|e| crate::Error::InvalidInput {
                field: "cache.remote_url".to_string(),
                reason: format!("not a valid URL: {e}"),
            })?;
            match parsed.scheme() {
                "https" => {}
                "http" => warn!("Cache service URL uses plain HTTP: {}", url),
                other => {
                    return Err(crate::Error::InvalidInput {
                        field: "cache.remote_url".to_string(),
                        reason: format!("unsupported scheme '{other}'"),
                    });
                }
            }
        }

        // Validate source configuration
        if self.sources.enabled.is_empty() {
            return Err(crate::Error::InvalidInput {
                field: "sources.enabled".to_string(),
                reason: "At least one source must be enabled".to_string(),
            });
        }
        for name in &self.sources.enabled {
            if !crate::client::providers::SOURCE_NAMES.contains(&name.as_str()) {
                return Err(crate::Error::InvalidInput {
                    field: "sources.enabled".to_string(),
                    reason: format!(
                        "Unknown source '{}'. Available: {:?}",
                        name,
                        crate::client::providers::SOURCE_NAMES
                    ),
                });
            }
        }
        for name in &self.sources.priority {
            if !crate::client::providers::SOURCE_NAMES.contains(&name.as_str()) {
                warn!("Priority list names unknown source '{}', ignoring", name);
            }
        }
        for (name, endpoint) in &self.sources.endpoints {
            if !crate::client::providers::SOURCE_NAMES.contains(&name.as_str()) {
                warn!("Endpoint override names unknown source '{}', ignoring", name);
            }
            let parsed = url::Url::parse(endpoint).map_err(|e| crate::Error::InvalidInput {
                field: format!("sources.endpoints.{name}"),
                reason: format!("not a valid URL: {e}"),
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(crate::Error::InvalidInput {
                    field: format!("sources.endpoints.{name}"),
                    reason: format!("unsupported scheme '{}'", parsed.scheme()),
                });
            }
        }

        // Validate logging configuration
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(crate::Error::InvalidInput {
                field: "logging.level".to_string(),
                reason: format!(
                    "Invalid log level '{}'. Valid levels: {:?}",
                    self.logging.level, valid_log_levels
                ),
            });
        }

        let valid_log_formats = ["json", "text"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(crate::Error::InvalidInput {
                field: "logging.format".to_string(),
                reason: format!(
                    "Invalid log format '{}'. Valid formats: {:?}",
                    self.logging.format, valid_log_formats
                ),
            });
        }

        // Validate profile
        let valid_profiles = ["development", "production"];
        if !valid_profiles.contains(&self.profile.as_str()) {
            warn!(
                "Unknown profile '{}'. Valid profiles: {:?}",
                self.profile, valid_profiles
            );
        }

        Ok(())
    }

    /// Whether any endpoint override requires plain HTTP (local mocks,
    /// self-hosted mirrors). The HTTP client factory keys off this.
    #[must_use]
    pub fn any_http_endpoint(&self) -> bool {
        self.sources
            .endpoints
            .values()
            .any(|endpoint| endpoint.starts_with("http://"))
    }

    /// Generate an example configuration file with all options documented
    #[must_use]
    pub fn generate_example_config() -> String {
        let example_config = r#"# Paper Search Engine Configuration
# This file demonstrates all available configuration options with their defaults

# Configuration schema version (for future compatibility)
schema_version = "1.0"

# Environment profile: "development" or "production"
profile = "development"

[search]
# Maximum adapter calls in flight at once per search (default: 4)
max_concurrent_sources = 4

# Per-adapter call timeout in seconds (default: 10)
source_timeout_secs = 10

# Overall search deadline in seconds (default: 25)
search_deadline_secs = 25

# Upper bound callers may request for per_page (default: 100)
max_per_page = 100

# Maximum accepted query length in characters (default: 512)
max_query_length = 512

[cache]
# Shared cache service base URL; omit for in-process caching only
# remote_url = "https://cache.internal:8200"

# TTL for broad searches in seconds (default: 600)
broad_ttl_secs = 600

# TTL for single-paper DOI lookups in seconds (default: 86400)
lookup_ttl_secs = 86400

# Entry bound for the in-process tier (default: 512)
max_entries = 512

[sources]
# Adapters available to searches, in dispatch order
enabled = [
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
]

# Dedup winner order, most complete metadata first
priority = [
    "crossref",
    "openalex",
    "semantic_scholar",
    "pubmed",
    "eric",
    "doaj",
    "core",
    "arxiv",
    "google_books",
    "google_scholar",
]

# Minimum call interval for sources without their own setting (default: 1000)
default_interval_ms = 1000

# Per-source base URL overrides (self-hosted mirrors, tests)
# [sources.endpoints]
# eric = "https://eric.mirror.internal"

# Per-source minimum call interval overrides in milliseconds
# [sources.min_interval_ms]
# google_scholar = 10000

[logging]
# Log level: "trace", "debug", "info", "warn", "error" (default: "info")
level = "info"

# Log format: "json" or "text" (default: "text")
format = "text"

# Optional log file path (default: none, logs to stderr)
# file = "/var/log/paper-search-engine.log"

# Environment Variables:
# Override selected settings using the PSE_ prefix:
# PSE_LOG_LEVEL=debug
# PSE_PROFILE=production
# PSE_CACHE_URL=https://cache.internal:8200
# PSE_SEARCH_DEADLINE_SECS=30
# PSE_MAX_CONCURRENT_SOURCES=8

# Command Line Arguments:
# --log-level debug --profile production --cache-url https://cache.internal:8200
"#;
        example_config.to_string()
    }

    /// Validate configuration file security
    fn validate_config_file_security(path: &std::path::Path) -> crate::Result<()> {
        if path.exists() {
            let metadata = std::fs::symlink_metadata(path).map_err(|e| {
                crate::Error::Service(format!("Failed to check config file metadata: {e}"))
            })?;

            if metadata.file_type().is_symlink() {
                return Err(crate::Error::Service(format!(
                    "Security: Refusing to read configuration from symbolic link: {:?}",
                    path
                )));
            }

            #[cfg(unix)]
            {
                let permissions = metadata.permissions();
                let mode = permissions.mode();

                if (mode & 0o077) != 0 {
                    warn!(
                        "Security: Configuration file has overly permissive permissions ({:o}): {:?}. \
                        Consider setting permissions to 0600 for security.",
                        mode & 0o777,
                        path
                    );
                }
            }
        }
        Ok(())
    }

    /// Resolve the configured log file path with tilde expansion.
    #[must_use]
    pub fn log_file_path(&self) -> Option<PathBuf> {
        self.logging
            .file
            .as_ref()
            .map(|p| expand_path(&p.to_string_lossy()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_sources_cover_all_adapters() {
        let config = Config::default();
        assert_eq!(
            config.sources.enabled.len(),
            crate::client::providers::SOURCE_NAMES.len()
        );
        assert_eq!(
            config.sources.priority.len(),
            crate::client::providers::SOURCE_NAMES.len()
        );
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.search.max_concurrent_sources = 0;
        assert!(config.validate().is_err());

        config.search.max_concurrent_sources = 4;
        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "info".to_string();
        config.sources.enabled.clear();
        assert!(config.validate().is_err());

        config.sources.enabled = vec!["not_a_source".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cache_url_validation() {
        let mut config = Config::default();
        config.cache.remote_url = Some("https://cache.internal:8200".to_string());
        assert!(config.validate().is_ok());

        config.cache.remote_url = Some("redis://cache.internal".to_string());
        assert!(config.validate().is_err());

        config.cache.remote_url = Some("not a url".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_endpoint_override_validation() {
        let mut config = Config::default();
        config
            .sources
            .endpoints
            .insert("eric".to_string(), "http://127.0.0.1:4545".to_string());
        assert!(config.validate().is_ok());
        assert!(config.any_http_endpoint());

        config
            .sources
            .endpoints
            .insert("doaj".to_string(), "file:///tmp/x".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_path_expansion() {
        let expanded = expand_path("~/logs/engine.log");
        if let Some(home_dir) = dirs::home_dir() {
            assert_eq!(expanded, home_dir.join("logs/engine.log"));
        } else {
            assert_eq!(expanded, PathBuf::from("~/logs/engine.log"));
        }

        let expanded = expand_path("/absolute/path");
        assert_eq!(expanded, PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_config_overrides() {
        let overrides = ConfigOverrides {
            log_level: Some("warn".to_string()),
            profile: Some("production".to_string()),
            cache_url: Some("https://cache.internal:8200".to_string()),
            search_deadline_secs: Some(40),
        };

        let config = Config::apply_cli_overrides(Config::default(), &overrides);

        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.profile, "production");
        assert_eq!(
            config.cache.remote_url.as_deref(),
            Some("https://cache.internal:8200")
        );
        assert_eq!(config.search.search_deadline_secs, 40);
    }

    #[test]
    fn test_profile_settings() {
        let mut config = Config::default();
        config.profile = "development".to_string();
        config.logging.level = "info".to_string();

        let config = Config::apply_profile_settings(config);
        assert_eq!(config.logging.level, "debug");

        let mut config = Config::default();
        config.profile = "production".to_string();
        let config = Config::apply_profile_settings(config);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_schema_generation() {
        let schema = Config::generate_schema();
        assert!(schema.is_object());
    }

    #[test]
    fn test_example_config_generation() {
        let example = Config::generate_example_config();
        assert!(example.contains("schema_version"));
        assert!(example.contains("[search]"));
        assert!(example.contains("[cache]"));
        assert!(example.contains("[sources]"));
        assert!(example.contains("[logging]"));

        // The example must itself be loadable
        let parsed: Config = toml::from_str(&example).expect("example config should parse");
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
profile = "production"

[search]
search_deadline_secs = 45

[sources]
enabled = ["eric", "doaj"]
"#,
        )
        .expect("write config");

        let config = Config::load_from_file(&path).expect("load");
        assert_eq!(config.search.search_deadline_secs, 45);
        assert_eq!(config.sources.enabled, vec!["eric", "doaj"]);
        // Profile pass runs after file load
        assert_eq!(config.logging.format, "json");
    }
}

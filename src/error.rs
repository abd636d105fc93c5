use thiserror::Error;

/// Crate-level result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to callers of the aggregation engine.
///
/// Per-source failures never appear here: an adapter that times out or
/// returns garbage degrades to a `source_status` entry on the response.
/// Only request-level problems (bad input, configuration, every source
/// down) become an `Error`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input for field '{field}': {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("All sources failed: {detail}")]
    AllSourcesFailed { detail: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Service error: {0}")]
    Service(String),
}

impl Error {
    /// Whether the caller could plausibly succeed by retrying later.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::AllSourcesFailed { .. } | Self::Http(_))
    }

    /// Stable machine-readable tag for logs and the CLI exit path.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "invalid_input",
            Self::AllSourcesFailed { .. } => "all_sources_failed",
            Self::Http(_) => "http",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Service(_) => "service",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_display() {
        let err = Error::InvalidInput {
            field: "year_start".to_string(),
            reason: "year_start (2025) is after year_end (2020)".to_string(),
        };
        assert!(err.to_string().contains("year_start"));
        assert_eq!(err.kind(), "invalid_input");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_all_sources_failed_is_retryable() {
        let err = Error::AllSourcesFailed {
            detail: "eric: timed-out; core: error: HTTP 500".to_string(),
        };
        assert!(err.is_retryable());
        assert_eq!(err.kind(), "all_sources_failed");
    }
}

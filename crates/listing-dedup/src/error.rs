//! Error types for listing-dedup

use listing_domain::RecordId;
use thiserror::Error;

use crate::engine::Phase;

/// Result type alias for deduplication operations
pub type Result<T> = std::result::Result<T, DedupError>;

/// Errors that fail a whole deduplication call
///
/// Per-record problems never surface here; they are reported as
/// `RejectedRecord` entries in the outcome.
#[derive(Error, Debug)]
pub enum DedupError {
    /// Configuration rejected before any record was processed
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Two input records share one identifier
    #[error("Duplicate record identifier in input: {0}")]
    DuplicateRecordId(RecordId),

    /// The caller's budget ran out; nothing was merged
    #[error("Deduplication interrupted during {phase}")]
    Interrupted { phase: Phase },
}

/// Configuration validation and loading errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Value is out of valid range
    #[error("Value out of range: {name} = {value}")]
    OutOfRange { name: String, value: f64 },

    /// Threshold values are invalid relative to each other
    #[error("Invalid thresholds: {0}")]
    InvalidThresholds(String),

    /// Field weights cannot produce a score
    #[error("Invalid weights: {0}")]
    InvalidWeights(String),

    /// Exact-match field set is unusable
    #[error("Invalid exact-match fields: {0}")]
    InvalidExactFields(String),

    /// IO error while reading a config file
    #[error("IO error: {0}")]
    Io(String),

    /// TOML/JSON parse error
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

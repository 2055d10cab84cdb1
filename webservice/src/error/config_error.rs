use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or interpreting the credential store.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The credential file could not be read or written.
    #[error("failed to access key store '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The credential file is not valid JSON for the expected shape.
    #[error("failed to parse key store '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A record lacks a field its authentication kind needs.
    #[error("key store entry is missing '{field}'")]
    MissingField { field: &'static str },

    /// The record's host is not an absolute URL.
    #[error("key store host '{host}' is not a valid URL: {message}")]
    InvalidHost { host: String, message: String },

    /// No local data directory could be determined for the default path.
    #[error("no local data directory available")]
    NoDataDirectory,
}

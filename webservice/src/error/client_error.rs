use thiserror::Error;

/// Transport-level errors: connection state, network and local I/O.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The connection was disposed (or never connected); no I/O was attempted.
    #[error("web service is not connected")]
    NotConnected,

    /// The HTTP client reported an error (connect, timeout, body read, ...).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Writing a download to disk failed.
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// A request URI could not be resolved against the base address.
    #[error("invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// A header name or value was rejected.
    #[error("invalid header '{name}': {message}")]
    InvalidHeader { name: String, message: String },
}

use reqwest::StatusCode;
use thiserror::Error;

use super::{
    ArgumentError, AuthError, ClientError, ConfigError, SerializationError, ServiceFailure,
};

/// Top-level error for every web service operation.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Pre-flight validation of the call arguments failed.
    #[error(transparent)]
    Argument(#[from] ArgumentError),

    /// Transport state or network failure.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The server answered with a non-success status.
    #[error(transparent)]
    Failure(#[from] ServiceFailure),

    /// Authentication could not be established.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A typed body could not be encoded or decoded.
    #[error(transparent)]
    Serialization(#[from] SerializationError),

    /// The credential store could not be used.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ServiceError {
    /// Returns the classified failure, if this error came from a response.
    pub fn as_failure(&self) -> Option<&ServiceFailure> {
        match self {
            Self::Failure(failure) => Some(failure),
            _ => None,
        }
    }

    /// The HTTP status of a classified failure.
    pub fn status(&self) -> Option<StatusCode> {
        self.as_failure().map(ServiceFailure::status)
    }

    /// The diagnostic label of a classified failure.
    pub fn label(&self) -> Option<&str> {
        self.as_failure().map(ServiceFailure::label)
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    pub fn is_not_connected(&self) -> bool {
        matches!(self, Self::Client(ClientError::NotConnected))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Client(ClientError::Cancelled))
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(error: reqwest::Error) -> Self {
        Self::Client(ClientError::Request(error))
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(error: std::io::Error) -> Self {
        Self::Client(ClientError::Io(error))
    }
}

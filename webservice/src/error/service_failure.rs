use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

/// A response with a non-success status.
///
/// Carries everything needed to diagnose a failed call in a multi-call trace:
/// the status code and reason phrase, the URI that was requested, the response
/// body (when it could be read) and the label of the operation that issued the
/// request. Constructed once per failure and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "{} {}: \"{}\" {} from {label}",
    .status.as_u16(),
    .reason.as_deref().unwrap_or_default(),
    .request_uri.as_ref().map(Url::as_str).unwrap_or_default(),
    .message.as_deref().unwrap_or_default()
)]
pub struct ServiceFailure {
    message: Option<String>,
    request_uri: Option<Url>,
    status: StatusCode,
    reason: Option<String>,
    label: String,
}

impl ServiceFailure {
    /// Builds a failure from the parts of a response. Blank bodies and
    /// reason phrases are dropped.
    pub(crate) fn new(
        message: Option<String>,
        request_uri: Option<Url>,
        status: StatusCode,
        reason: Option<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            message: message.filter(|m| !m.trim().is_empty()),
            request_uri,
            status,
            reason: reason.filter(|r| !r.trim().is_empty()),
            label: label.into(),
        }
    }

    /// The response body read for diagnostics, if any.
    ///
    /// Not part of any contract with the server; may be absent.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The URI the failing request was sent to.
    pub fn request_uri(&self) -> Option<&Url> {
        self.request_uri.as_ref()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The reason phrase of the status line.
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// The caller-supplied label of the operation that failed.
    pub fn label(&self) -> &str {
        &self.label
    }
}

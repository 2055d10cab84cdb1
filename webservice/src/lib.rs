//! Client-side toolkit for calling HTTP web services.
//!
//! A [`ServiceConnection`] owns one HTTP client for one remote service. It
//! applies an [`Authenticator`](auth::Authenticator) once while it is built,
//! sends every request through a single executor that classifies failed
//! responses into a [`ServiceFailure`](error::ServiceFailure), and exposes thin
//! verb operations on top. [`TypedService`] adds typed request and response
//! bodies through a shared [`SerializerRegistry`](serializer::SerializerRegistry).
//!
//! Per-service clients wrap one of the two and declare their endpoints as
//! small methods:
//!
//! ```rust,ignore
//! use webservice::url_builder::combine_url;
//! use webservice::{CancellationToken, ServiceError, TypedService};
//!
//! pub struct IssueTracker {
//!     service: TypedService,
//! }
//!
//! impl IssueTracker {
//!     pub async fn issue(&self, key: &str, cancel: &CancellationToken) -> Result<Issue, ServiceError> {
//!         let uri = combine_url(&["rest/api/2/issue", key], &[("expand", "names".into())]);
//!         self.service.get(&uri, "issue", cancel).await
//!     }
//! }
//! ```
//!
//! ## Modules
//!
//! - [`auth`] - authentication strategies
//! - [`error`] - the error taxonomy rooted at [`ServiceError`]
//! - [`serializer`] - typed body serializers
//! - [`store`] - named host and credential records
//! - [`url_builder`] - request path and query construction
//!
//! Every operation takes a diagnostic label and a [`CancellationToken`].
//! Requests time out after [`DEFAULT_TIMEOUT`]; nothing is retried.

pub mod auth;
mod connection;
mod content;
pub mod error;
mod method;
pub mod serializer;
pub mod store;
mod transport;
mod typed;
pub mod url_builder;

pub use connection::{
    ByteStream, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, ServiceConnection, ServiceConnectionBuilder,
};
pub use content::{ATLASSIAN_TOKEN_HEADER, Content, Upload};
pub use error::ServiceError;
pub use method::RestMethod;
pub use transport::Transport;
pub use typed::{TypedService, TypedServiceBuilder};

pub use tokio_util::sync::CancellationToken;

//! Layered error types for web service calls.
//!
//! Everything the crate returns funnels into [`ServiceError`] so callers can
//! branch on one type:
//! - [`ArgumentError`] - pre-flight input validation, raised before any I/O
//! - [`ClientError`] - transport state and network failures
//! - [`ServiceFailure`] - a response with a non-success status
//! - [`AuthError`] - authentication setup and verification failures
//! - [`SerializationError`] - typed body encoding and decoding
//! - [`ConfigError`] - credential store loading

mod argument_error;
mod auth_error;
mod client_error;
mod config_error;
mod serialization_error;
mod service_error;
mod service_failure;

pub use argument_error::ArgumentError;
pub use auth_error::AuthError;
pub use client_error::ClientError;
pub use config_error::ConfigError;
pub use serialization_error::SerializationError;
pub use service_error::ServiceError;
pub use service_failure::ServiceFailure;

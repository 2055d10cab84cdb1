//! Typed body serialization.
//!
//! A [`SerializerRegistry`] maps Rust types to the [`TypeSerializer`] that
//! turns them into request bodies and parses them back out of responses. The
//! registry is built once by the caller and shared with every
//! [`TypedService`](crate::TypedService) that needs it.

mod datetime;
mod format;
mod registry;

pub use datetime::lenient_datetime;
pub use format::Format;
pub use registry::{SerializerRegistry, TypeSerializer};

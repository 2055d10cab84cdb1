use thiserror::Error;

/// Errors raised by the typed serialization layer.
#[derive(Debug, Error)]
pub enum SerializationError {
    /// JSON encoding or decoding failed.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// XML decoding failed.
    #[error("XML deserialization failed: {0}")]
    Xml(#[from] quick_xml::DeError),

    /// XML encoding failed.
    #[error("XML serialization failed: {0}")]
    XmlEncode(#[from] quick_xml::SeError),

    /// No serializer was registered for the requested type.
    #[error("no serializer registered for type '{type_name}'")]
    Unregistered { type_name: &'static str },
}

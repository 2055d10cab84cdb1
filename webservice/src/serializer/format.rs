use strum::{Display, EnumString};

/// Wire formats a [`TypeSerializer`](super::TypeSerializer) can speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Format {
    #[default]
    Json,
    Xml,
}

impl Format {
    /// The `Content-Type` sent with bodies in this format.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Xml => "application/xml",
        }
    }

    /// Whether `encoded` carries no value at all.
    pub(crate) fn is_empty_body(&self, encoded: &str) -> bool {
        let trimmed = encoded.trim();
        match self {
            Self::Json => trimmed.is_empty() || trimmed == "null",
            Self::Xml => trimmed.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_types() {
        assert_eq!(Format::Json.content_type(), "application/json");
        assert_eq!(Format::Xml.content_type(), "application/xml");
        assert_eq!("xml".parse::<Format>().unwrap(), Format::Xml);
    }

    #[test]
    fn test_empty_bodies() {
        assert!(Format::Json.is_empty_body("null"));
        assert!(Format::Json.is_empty_body("  "));
        assert!(!Format::Json.is_empty_body("{}"));
        assert!(Format::Xml.is_empty_body(""));
    }
}

use crate::error::AuthError;

/// Text encodings used to turn credentials into bytes before hashing or
/// base64 encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    /// ISO-8859-1; characters above U+00FF are rejected.
    Latin1,
    /// UTF-16 little endian.
    Utf16Le,
}

impl TextEncoding {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::Latin1 => "ISO-8859-1",
            Self::Utf16Le => "UTF-16LE",
        }
    }

    /// Encodes `text` into bytes.
    ///
    /// ## Errors
    ///
    /// Returns [`AuthError::UnsupportedEncoding`] when a character has no
    /// representation in this encoding.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>, AuthError> {
        match self {
            Self::Utf8 => Ok(text.as_bytes().to_vec()),
            Self::Latin1 => text
                .chars()
                .map(|c| {
                    u8::try_from(u32::from(c)).map_err(|_| AuthError::UnsupportedEncoding {
                        character: c,
                        encoding: self.name(),
                    })
                })
                .collect(),
            Self::Utf16Le => Ok(text.encode_utf16().flat_map(u16::to_le_bytes).collect()),
        }
    }
}

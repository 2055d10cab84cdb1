//! Request bodies and multipart uploads.

use std::path::Path;

use bytes::Bytes;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, RequestBuilder};
use tokio_util::io::ReaderStream;

/// Legacy marker some deployed servers require on multipart uploads.
pub const ATLASSIAN_TOKEN_HEADER: &str = "X-Atlassian-Token";
const ATLASSIAN_TOKEN_VALUE: &str = "nocheck";

/// Form field every uploaded file is attached under.
const UPLOAD_FIELD: &str = "file";

/// The body of a request.
#[derive(Debug, Default)]
pub struct Content {
    kind: ContentKind,
}

#[derive(Debug, Default)]
enum ContentKind {
    #[default]
    Empty,
    Bytes {
        data: Bytes,
        content_type: Option<HeaderValue>,
    },
    Multipart(Form),
}

impl Content {
    /// No body.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Raw bytes with an optional content type.
    pub fn bytes(data: impl Into<Bytes>, content_type: Option<&'static str>) -> Self {
        Self {
            kind: ContentKind::Bytes {
                data: data.into(),
                content_type: content_type.map(HeaderValue::from_static),
            },
        }
    }

    /// A body sent as `application/json`.
    pub fn json(data: impl Into<Bytes>) -> Self {
        Self::bytes(data, Some("application/json"))
    }

    /// A UTF-8 `text/plain` body.
    pub fn text(text: impl Into<String>) -> Self {
        Self::bytes(text.into(), Some("text/plain; charset=utf-8"))
    }

    /// A multipart form holding `uploads`, each under the `file` field with its
    /// key as file name.
    pub fn files(uploads: impl IntoIterator<Item = Upload>) -> Self {
        let form = uploads.into_iter().fold(Form::new(), |form, upload| {
            form.part(
                UPLOAD_FIELD,
                Part::stream(upload.body).file_name(upload.key),
            )
        });
        Self {
            kind: ContentKind::Multipart(form),
        }
    }

    /// `true` when no body is sent.
    pub fn is_empty(&self) -> bool {
        matches!(self.kind, ContentKind::Empty)
    }

    pub(crate) fn apply(self, request: RequestBuilder) -> RequestBuilder {
        match self.kind {
            ContentKind::Empty => request,
            ContentKind::Bytes { data, content_type } => {
                let request = match content_type {
                    Some(content_type) => request.header(CONTENT_TYPE, content_type),
                    None => request,
                };
                request.body(data)
            }
            ContentKind::Multipart(form) => request
                .header(ATLASSIAN_TOKEN_HEADER, ATLASSIAN_TOKEN_VALUE)
                .multipart(form),
        }
    }
}

/// One file of a multipart upload: its logical key and a body source.
#[derive(Debug)]
pub struct Upload {
    key: String,
    body: Body,
}

impl Upload {
    /// An in-memory part.
    pub fn bytes(key: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            body: Body::from(data.into()),
        }
    }

    /// Streams an open file without buffering it in memory.
    pub fn stream(key: impl Into<String>, file: tokio::fs::File) -> Self {
        Self {
            key: key.into(),
            body: Body::wrap_stream(ReaderStream::new(file)),
        }
    }

    /// Opens `path` and streams it under `key`.
    ///
    /// ## Errors
    ///
    /// Returns the I/O error if `path` cannot be opened.
    pub async fn file(key: impl Into<String>, path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = tokio::fs::File::open(path).await?;
        Ok(Self::stream(key, file))
    }

    /// The file name the part is sent under.
    pub fn key(&self) -> &str {
        &self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_content() {
        assert!(Content::empty().is_empty());
        assert!(!Content::text("x").is_empty());
        assert!(!Content::files(Vec::new()).is_empty());
    }

    #[test]
    fn test_json_sets_content_type() {
        let request = Content::json(r#"{"a":1}"#)
            .apply(reqwest::Client::new().post("https://example.com/"))
            .build()
            .unwrap();
        assert_eq!(request.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(request.body().and_then(|b| b.as_bytes()), Some(&b"{\"a\":1}"[..]));
    }

    #[test]
    fn test_files_carry_atlassian_marker() {
        let request = Content::files([Upload::bytes("a.txt", "hello")])
            .apply(reqwest::Client::new().put("https://example.com/"))
            .build()
            .unwrap();
        assert_eq!(request.headers()[ATLASSIAN_TOKEN_HEADER], "nocheck");
        assert!(
            request.headers()[CONTENT_TYPE]
                .to_str()
                .unwrap()
                .starts_with("multipart/form-data")
        );
    }
}

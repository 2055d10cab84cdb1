//! Request path and query string construction.
//!
//! These are pure functions: the same segments and entries always produce the
//! same string, so request URIs are reproducible across calls and in tests.
//!
//! ## Query entry rules
//!
//! | value                    | rendered          |
//! |--------------------------|-------------------|
//! | [`QueryValue::Absent`]   | omitted           |
//! | blank text               | `name`            |
//! | [`QueryValue::Flag`]     | `name=true/false` |
//! | text                     | `name=value`      |
//!
//! Names and values are escaped with [`escape`].
//!
//! ## Examples
//!
//! ```rust
//! use webservice::url_builder::{combine_url, QueryValue};
//!
//! let url = combine_url(
//!     &["rest/api/2/", "/search"],
//!     &[
//!         ("jql", "project = DEMO".into()),
//!         ("startAt", 50u32.into()),
//!         ("validate", true.into()),
//!         ("fields", QueryValue::Absent),
//!     ],
//! );
//! assert_eq!(url, "rest/api/2/search?jql=project+%3D+DEMO&startAt=50&validate=true");
//! ```

/// The value half of a query entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    /// No value: the entry is dropped from the query.
    Absent,
    /// Rendered as lowercase `true` / `false`.
    Flag(bool),
    /// Escaped text; blank text degrades to the bare name.
    Text(String),
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for QueryValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl<T: Into<QueryValue>> From<Option<T>> for QueryValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Into::into)
    }
}

macro_rules! query_value_from_display {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for QueryValue {
                fn from(value: $ty) -> Self {
                    Self::Text(value.to_string())
                }
            }
        )*
    };
}

query_value_from_display!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize, f32, f64, char);

/// Escapes the reserved query characters.
///
/// Space becomes `+`; `&`, `/`, `=`, `?`, `@`, `[` and `]` are percent-encoded.
/// Neither `%` nor `+` is touched, so escaping an escaped string is a no-op.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            ' ' => out.push('+'),
            '&' => out.push_str("%26"),
            '/' => out.push_str("%2F"),
            '=' => out.push_str("%3D"),
            '?' => out.push_str("%3F"),
            '@' => out.push_str("%40"),
            '[' => out.push_str("%5B"),
            ']' => out.push_str("%5D"),
            other => out.push(other),
        }
    }
    out
}

/// Joins path segments with a single `/`.
///
/// Leading and trailing slashes of every segment are trimmed; segments that are
/// empty after trimming are skipped.
pub fn combine_path(segments: &[&str]) -> String {
    segments
        .iter()
        .map(|segment| segment.trim_matches('/'))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Joins path segments and appends the query built from `entries`.
///
/// Entries keep the caller's order. When the combined path already carries a
/// query the new entries are appended with `&`. A path that ends up with no
/// entries is returned without a trailing `?` or `&`.
pub fn combine_url(segments: &[&str], entries: &[(&str, QueryValue)]) -> String {
    let path = combine_path(segments);
    let query = combine_query(entries);

    if query.is_empty() {
        return path.trim_end_matches(['?', '&']).to_string();
    }

    let separator = if path.ends_with(['?', '&']) {
        ""
    } else if path.contains('?') {
        "&"
    } else {
        "?"
    };
    format!("{path}{separator}{query}")
}

fn combine_query(entries: &[(&str, QueryValue)]) -> String {
    entries
        .iter()
        .filter_map(|(name, value)| query_entry(name, value))
        .filter(|entry| !entry.trim().is_empty())
        .collect::<Vec<_>>()
        .join("&")
}

fn query_entry(name: &str, value: &QueryValue) -> Option<String> {
    match value {
        QueryValue::Absent => None,
        QueryValue::Flag(flag) => Some(format!("{}={flag}", escape(name))),
        QueryValue::Text(text) if text.trim().is_empty() => Some(escape(name)),
        QueryValue::Text(text) => Some(format!("{}={}", escape(name), escape(text))),
    }
}

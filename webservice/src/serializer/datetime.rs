/// Serde helper for optional timestamps written in inconsistent formats.
///
/// Accepts RFC 3339, RFC 2822, ISO 8601 offsets without a colon (`+0100`) and
/// timestamps without any offset (read as UTC). Values that match none of
/// these deserialize to `None` instead of failing the whole document.
/// Serializes as RFC 3339.
///
/// ```rust
/// use chrono::{DateTime, FixedOffset};
///
/// #[derive(serde::Deserialize)]
/// struct Issue {
///     #[serde(default, with = "webservice::serializer::lenient_datetime")]
///     updated: Option<DateTime<FixedOffset>>,
/// }
///
/// let issue: Issue = serde_json::from_str(r#"{"updated":"2024-03-01T09:30:00.000+0100"}"#).unwrap();
/// assert!(issue.updated.is_some());
/// ```
pub mod lenient_datetime {
    use chrono::{DateTime, FixedOffset, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];
    const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    pub fn serialize<S>(value: &Option<DateTime<FixedOffset>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(value) => serializer.serialize_str(&value.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<FixedOffset>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = Option::<String>::deserialize(deserializer)?;
        Ok(text.as_deref().and_then(parse))
    }

    pub(crate) fn parse(text: &str) -> Option<DateTime<FixedOffset>> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        DateTime::parse_from_rfc3339(text)
            .or_else(|_| DateTime::parse_from_rfc2822(text))
            .ok()
            .or_else(|| {
                OFFSET_FORMATS
                    .iter()
                    .find_map(|format| DateTime::parse_from_str(text, format).ok())
            })
            .or_else(|| {
                NAIVE_FORMATS.iter().find_map(|format| {
                    NaiveDateTime::parse_from_str(text, format)
                        .ok()
                        .map(|naive| naive.and_utc().fixed_offset())
                })
            })
    }

}

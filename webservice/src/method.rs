//! HTTP verbs issued by a service connection.

use strum::{Display, EnumIter, EnumString};

/// The verbs a [`ServiceConnection`](crate::ServiceConnection) sends.
///
/// ## Examples
///
/// ```rust
/// use webservice::RestMethod;
///
/// let method = RestMethod::Put;
/// assert!(method.has_body());
///
/// let parsed: RestMethod = "DELETE".parse().unwrap();
/// assert_eq!(parsed, RestMethod::Delete);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum RestMethod {
    Get,
    Put,
    Post,
    Patch,
    Delete,
}

impl RestMethod {
    /// Returns `true` for the verbs that carry a request body.
    pub fn has_body(&self) -> bool {
        matches!(self, Self::Put | Self::Post | Self::Patch)
    }

    /// Converts to the equivalent `reqwest::Method`.
    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Put => reqwest::Method::PUT,
            Self::Post => reqwest::Method::POST,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

impl From<RestMethod> for reqwest::Method {
    fn from(method: RestMethod) -> Self {
        method.to_reqwest()
    }
}

//! The transport handle owned by a service connection.
//!
//! A [`Transport`] bundles the shared `reqwest::Client` with the base address
//! and the default headers sent on every request. Authenticators receive it
//! mutably once, while the connection is being built, and write their
//! credentials into the default headers.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{RequestBuilder, Response};
use url::Url;

use crate::error::{ClientError, ServiceError};
use crate::method::RestMethod;

/// One HTTP client plus the default headers applied to each request.
#[derive(Debug, Clone)]
pub struct Transport {
    client: reqwest::Client,
    base_url: Url,
    headers: HeaderMap,
}

impl Transport {
    pub(crate) fn new(client: reqwest::Client, base_url: Url, headers: HeaderMap) -> Self {
        Self {
            client,
            base_url,
            headers,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The headers sent with every request.
    pub fn default_headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Sets a default header, replacing any earlier value under the same name.
    ///
    /// ## Errors
    ///
    /// Returns [`ClientError::InvalidHeader`] if the name or value is not a
    /// valid HTTP header.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<(), ServiceError> {
        let (name, value) = parse_header(name, value)?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Like [`set_header`](Self::set_header), but marks the value sensitive so
    /// it is redacted from `Debug` output.
    pub fn set_secret_header(&mut self, name: &str, value: &str) -> Result<(), ServiceError> {
        let (name, mut value) = parse_header(name, value)?;
        value.set_sensitive(true);
        self.headers.insert(name, value);
        Ok(())
    }

    /// Resolves a request URI against the base address.
    ///
    /// Absolute URIs are used as they are; anything else is joined onto the
    /// base address.
    pub fn resolve(&self, uri: &str) -> Result<Url, ServiceError> {
        match Url::parse(uri) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                self.base_url.join(uri).map_err(|e| invalid_url(uri, e))
            }
            Err(e) => Err(invalid_url(uri, e)),
        }
    }

    /// Starts a request carrying the default headers.
    pub fn request(&self, method: RestMethod, url: Url) -> RequestBuilder {
        self.client
            .request(method.to_reqwest(), url)
            .headers(self.headers.clone())
    }

    /// Sends a plain GET without status classification.
    ///
    /// Used by authenticators that need to talk to the server before the
    /// connection exists.
    pub async fn get(&self, uri: &str) -> Result<Response, ServiceError> {
        let url = self.resolve(uri)?;
        Ok(self.request(RestMethod::Get, url).send().await?)
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), ServiceError> {
    let header_name = HeaderName::try_from(name).map_err(|e| ClientError::InvalidHeader {
        name: name.to_string(),
        message: e.to_string(),
    })?;
    let header_value = HeaderValue::try_from(value).map_err(|e| ClientError::InvalidHeader {
        name: name.to_string(),
        message: e.to_string(),
    })?;
    Ok((header_name, header_value))
}

fn invalid_url(uri: &str, error: url::ParseError) -> ServiceError {
    ClientError::InvalidUrl {
        url: uri.to_string(),
        message: error.to_string(),
    }
    .into()
}

//! Authenticators that write a single static header.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::header::AUTHORIZATION;
use tracing::debug;

use super::{Authenticator, BoxFuture, TextEncoding};
use crate::error::{AuthError, ClientError, ServiceError};
use crate::transport::Transport;

const REDACTED: &str = "<redacted>";

/// Writes a secret header, reporting text that cannot travel in a header as
/// invalid credentials.
fn set_credential(transport: &mut Transport, name: &str, value: &str) -> Result<(), ServiceError> {
    transport.set_secret_header(name, value).map_err(|e| match e {
        ServiceError::Client(ClientError::InvalidHeader { name, message }) => {
            AuthError::InvalidCredentials {
                message: format!("header '{name}': {message}"),
            }
            .into()
        }
        other => other,
    })
}

/// Sends an API key under a caller-chosen header name.
#[derive(Clone)]
pub struct ApiKeyAuthenticator {
    name: String,
    value: String,
}

impl ApiKeyAuthenticator {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Debug for ApiKeyAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyAuthenticator")
            .field("name", &self.name)
            .field("value", &REDACTED)
            .finish()
    }
}

impl Authenticator for ApiKeyAuthenticator {
    fn authenticate<'a>(
        &'a self,
        transport: &'a mut Transport,
    ) -> BoxFuture<'a, Result<(), ServiceError>> {
        debug!(header = %self.name, "applying API key");
        Box::pin(std::future::ready(
            set_credential(transport, &self.name, &self.value),
        ))
    }
}

/// Sends a raw token under a caller-chosen header name, without any scheme.
#[derive(Clone)]
pub struct TokenAuthenticator {
    name: String,
    token: String,
}

impl TokenAuthenticator {
    pub fn new(name: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            token: token.into(),
        }
    }
}

impl fmt::Debug for TokenAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAuthenticator")
            .field("name", &self.name)
            .field("token", &REDACTED)
            .finish()
    }
}

impl Authenticator for TokenAuthenticator {
    fn authenticate<'a>(
        &'a self,
        transport: &'a mut Transport,
    ) -> BoxFuture<'a, Result<(), ServiceError>> {
        Box::pin(std::future::ready(
            set_credential(transport, &self.name, &self.token),
        ))
    }
}

/// `Authorization: Bearer <token>`.
#[derive(Clone)]
pub struct BearerAuthenticator {
    token: String,
}

impl BearerAuthenticator {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl fmt::Debug for BearerAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerAuthenticator")
            .field("token", &REDACTED)
            .finish()
    }
}

impl Authenticator for BearerAuthenticator {
    fn authenticate<'a>(
        &'a self,
        transport: &'a mut Transport,
    ) -> BoxFuture<'a, Result<(), ServiceError>> {
        debug!("applying bearer token");
        Box::pin(std::future::ready(set_credential(
            transport,
            AUTHORIZATION.as_str(),
            &format!("Bearer {}", self.token),
        )))
    }
}

/// Login and password, base64 encoded as `login:password`.
#[derive(Clone)]
struct Credentials {
    login: String,
    password: String,
    encoding: TextEncoding,
}

impl Credentials {
    fn encoded(&self) -> Result<String, ServiceError> {
        let raw = self
            .encoding
            .encode(&format!("{}:{}", self.login, self.password))?;
        Ok(STANDARD.encode(raw))
    }

    fn debug_fields(&self, f: &mut fmt::DebugStruct<'_, '_>) {
        f.field("login", &self.login)
            .field("password", &REDACTED)
            .field("encoding", &self.encoding);
    }
}

/// `Authorization: Basic <base64(login:password)>`.
///
/// See [`BasicHeaderAuthenticator`] for servers that expect the encoded value
/// under a custom header instead.
#[derive(Clone)]
pub struct BasicAuthenticator {
    credentials: Credentials,
}

impl BasicAuthenticator {
    /// Credentials encoded as UTF-8.
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            credentials: Credentials {
                login: login.into(),
                password: password.into(),
                encoding: TextEncoding::Utf8,
            },
        }
    }

    #[must_use]
    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.credentials.encoding = encoding;
        self
    }

    /// The base64 value placed after `Basic `.
    pub fn encoded(&self) -> Result<String, ServiceError> {
        self.credentials.encoded()
    }
}

impl fmt::Debug for BasicAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("BasicAuthenticator");
        self.credentials.debug_fields(&mut s);
        s.finish()
    }
}

impl Authenticator for BasicAuthenticator {
    fn authenticate<'a>(
        &'a self,
        transport: &'a mut Transport,
    ) -> BoxFuture<'a, Result<(), ServiceError>> {
        debug!(login = %self.credentials.login, "applying basic credentials");
        let result = self.encoded().and_then(|encoded| {
            set_credential(transport, AUTHORIZATION.as_str(), &format!("Basic {encoded}"))
        });
        Box::pin(std::future::ready(result))
    }
}

/// Base64 `login:password` under a caller-chosen header, with no scheme prefix.
#[derive(Clone)]
pub struct BasicHeaderAuthenticator {
    name: String,
    credentials: Credentials,
}

impl BasicHeaderAuthenticator {
    pub fn new(
        name: impl Into<String>,
        login: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            credentials: Credentials {
                login: login.into(),
                password: password.into(),
                encoding: TextEncoding::Utf8,
            },
        }
    }

    #[must_use]
    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.credentials.encoding = encoding;
        self
    }
}

impl fmt::Debug for BasicHeaderAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("BasicHeaderAuthenticator");
        s.field("name", &self.name);
        self.credentials.debug_fields(&mut s);
        s.finish()
    }
}

impl Authenticator for BasicHeaderAuthenticator {
    fn authenticate<'a>(
        &'a self,
        transport: &'a mut Transport,
    ) -> BoxFuture<'a, Result<(), ServiceError>> {
        let result = self
            .credentials
            .encoded()
            .and_then(|encoded| set_credential(transport, &self.name, &encoded));
        Box::pin(std::future::ready(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderMap;
    use url::Url;

    fn transport() -> Transport {
        Transport::new(
            reqwest::Client::new(),
            Url::parse("https://example.com/").unwrap(),
            HeaderMap::new(),
        )
    }

    #[tokio::test]
    async fn test_api_key() {
        let mut transport = transport();
        ApiKeyAuthenticator::new("X-JFrog-Art-Api", "key-1")
            .authenticate(&mut transport)
            .await
            .unwrap();
        assert_eq!(transport.default_headers()["x-jfrog-art-api"], "key-1");
    }

    #[tokio::test]
    async fn test_token_is_raw() {
        let mut transport = transport();
        TokenAuthenticator::new("Private-Token", "abc")
            .authenticate(&mut transport)
            .await
            .unwrap();
        assert_eq!(transport.default_headers()["private-token"], "abc");
        assert!(transport.default_headers().get(AUTHORIZATION).is_none());
    }

    #[tokio::test]
    async fn test_bearer() {
        let mut transport = transport();
        BearerAuthenticator::new("tok")
            .authenticate(&mut transport)
            .await
            .unwrap();
        assert_eq!(transport.default_headers()[AUTHORIZATION], "Bearer tok");
    }

    #[tokio::test]
    async fn test_basic_authorization_header() {
        let mut transport = transport();
        BasicAuthenticator::new("user", "pass")
            .authenticate(&mut transport)
            .await
            .unwrap();
        assert_eq!(
            transport.default_headers()[AUTHORIZATION],
            "Basic dXNlcjpwYXNz"
        );
    }

    #[tokio::test]
    async fn test_basic_custom_header() {
        let mut transport = transport();
        BasicHeaderAuthenticator::new("X-Auth", "user", "pass")
            .authenticate(&mut transport)
            .await
            .unwrap();
        assert_eq!(transport.default_headers()["x-auth"], "dXNlcjpwYXNz");
        assert!(transport.default_headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_basic_encodings() {
        let utf8 = BasicAuthenticator::new("ä", "x");
        assert_eq!(utf8.encoded().unwrap(), "w6Q6eA==");

        let latin1 = BasicAuthenticator::new("ä", "x").with_encoding(TextEncoding::Latin1);
        assert_eq!(latin1.encoded().unwrap(), "5Dp4");

        let err = BasicAuthenticator::new("€", "x")
            .with_encoding(TextEncoding::Latin1)
            .encoded()
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Auth(AuthError::UnsupportedEncoding { .. })
        ));
    }

    #[tokio::test]
    async fn test_unusable_credentials_are_rejected() {
        let mut transport = transport();
        let err = BearerAuthenticator::new("tok\nen")
            .authenticate(&mut transport)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Auth(AuthError::InvalidCredentials { .. })
        ));
        assert!(!err.to_string().contains("tok"));

        let err = ApiKeyAuthenticator::new("bad header", "key")
            .authenticate(&mut transport)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Auth(AuthError::InvalidCredentials { .. })
        ));
        assert!(transport.default_headers().is_empty());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug = format!("{:?}", BasicAuthenticator::new("user", "hunter2"));
        assert!(debug.contains("user"));
        assert!(!debug.contains("hunter2"));

        let debug = format!("{:?}", BearerAuthenticator::new("sk-secret"));
        assert!(!debug.contains("sk-secret"));
    }
}

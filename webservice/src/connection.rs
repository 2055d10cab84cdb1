//! The service connection: lifecycle, verb operations and error classification.

use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{stream, Stream};
use hyper::ext::ReasonPhrase;
use reqwest::header::HeaderMap;
use reqwest::Response;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn, Span};
use url::Url;

use crate::auth::Authenticator;
use crate::content::{Content, Upload};
use crate::error::{ArgumentError, AuthError, ClientError, ServiceError, ServiceFailure};
use crate::method::RestMethod;
use crate::transport::Transport;

/// Fixed timeout applied to every request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// User agent sent when no application name is configured.
pub const DEFAULT_USER_AGENT: &str = "WebServices";

/// A response body delivered chunk by chunk.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ServiceError>> + Send>>;

/// Builder for [`ServiceConnection`].
///
/// Nothing touches the network until [`build`](Self::build) is awaited.
#[derive(Debug)]
pub struct ServiceConnectionBuilder {
    base_url: Url,
    authenticator: Option<Arc<dyn Authenticator>>,
    app_name: Option<String>,
    verify_path: Option<String>,
    default_headers: Vec<(String, String)>,
    accept_invalid_certs: bool,
}

impl ServiceConnectionBuilder {
    fn new(base_url: Url) -> Self {
        Self {
            base_url: with_trailing_slash(base_url),
            authenticator: None,
            app_name: None,
            verify_path: None,
            default_headers: Vec::new(),
            accept_invalid_certs: false,
        }
    }

    /// Authenticator applied once while the connection is built.
    #[must_use]
    pub fn authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    /// Like [`authenticator`](Self::authenticator) but leaves the builder
    /// unchanged for `None`.
    #[must_use]
    pub fn maybe_authenticator(mut self, authenticator: Option<Arc<dyn Authenticator>>) -> Self {
        if authenticator.is_some() {
            self.authenticator = authenticator;
        }
        self
    }

    /// Application name sent as the user agent.
    ///
    /// Blank names fall back to [`DEFAULT_USER_AGENT`].
    #[must_use]
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Endpoint checked with a GET after authentication.
    ///
    /// A non-success answer fails [`build`](Self::build) with
    /// [`AuthError::VerificationFailed`].
    #[must_use]
    pub fn verify_path(mut self, path: impl Into<String>) -> Self {
        self.verify_path = Some(path.into());
        self
    }

    /// A header sent with every request.
    ///
    /// Applied before the authenticator, so an authenticator writing the same
    /// header replaces it.
    #[must_use]
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Trusts any server certificate.
    ///
    /// Off by default. Only meant for appliances with self-signed
    /// certificates on a trusted network.
    #[must_use]
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Creates the client, applies the authenticator and runs the
    /// verification request.
    ///
    /// ## Errors
    ///
    /// - [`ClientError`] if the HTTP client cannot be built, a default header
    ///   is invalid, or the verification request cannot be sent
    /// - [`AuthError`] if the authenticator fails or the verification request is refused
    #[instrument(name = "service_connect", skip_all, fields(base_url = %self.base_url))]
    pub async fn build(self) -> Result<ServiceConnection, ServiceError> {
        let user_agent = self
            .app_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(DEFAULT_USER_AGENT);

        if self.accept_invalid_certs {
            warn!("certificate validation is disabled");
        }

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(user_agent)
            .danger_accept_invalid_certs(self.accept_invalid_certs)
            .build()
            .map_err(ClientError::Request)?;

        let mut transport = Transport::new(client, self.base_url.clone(), HeaderMap::new());
        for (name, value) in &self.default_headers {
            transport.set_header(name, value)?;
        }

        if let Some(authenticator) = &self.authenticator {
            debug!(?authenticator, "applying authenticator");
            authenticator.authenticate(&mut transport).await?;
        }

        if let Some(path) = &self.verify_path {
            verify(&transport, path).await?;
        }

        debug!(user_agent, "connected");
        Ok(ServiceConnection {
            base_url: self.base_url,
            transport: Some(transport),
            authenticator: self.authenticator,
        })
    }
}

/// A connection to one web service.
///
/// All verb operations take a diagnostic `label`, reported in logs and in
/// [`ServiceFailure`], and a [`CancellationToken`] that aborts the call with
/// [`ClientError::Cancelled`]. Relative URIs are resolved against the base
/// address; absolute URIs are used as they are.
///
/// ## Examples
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use webservice::{ServiceConnection, CancellationToken};
/// use webservice::auth::BearerAuthenticator;
///
/// let connection = ServiceConnection::builder(url::Url::parse("https://api.example.com/v1")?)
///     .authenticator(Arc::new(BearerAuthenticator::new(token)))
///     .verify_path("user")
///     .build()
///     .await?;
///
/// let cancel = CancellationToken::new();
/// let body = connection.get_string("repos", "list_repos", &cancel).await?;
/// ```
#[derive(Debug)]
pub struct ServiceConnection {
    base_url: Url,
    transport: Option<Transport>,
    authenticator: Option<Arc<dyn Authenticator>>,
}

impl ServiceConnection {
    /// Starts configuring a connection to `base_url`.
    ///
    /// The base address is normalized to end with `/` so relative request
    /// URIs extend it instead of replacing its last segment.
    pub fn builder(base_url: Url) -> ServiceConnectionBuilder {
        ServiceConnectionBuilder::new(base_url)
    }

    /// The base address relative request URIs are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The authenticator applied at construction.
    pub fn authenticator(&self) -> Option<&Arc<dyn Authenticator>> {
        self.authenticator.as_ref()
    }

    /// `false` once [`dispose`](Self::dispose) ran.
    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// The transport, while connected.
    pub fn transport(&self) -> Option<&Transport> {
        self.transport.as_ref()
    }

    /// Releases the transport. Calling it again has no effect.
    pub fn dispose(&mut self) {
        if self.transport.take().is_some() {
            debug!(base_url = %self.base_url, "disposed");
        }
    }

    pub(crate) fn set_default_header(&mut self, name: &str, value: &str) -> Result<(), ServiceError> {
        self.transport
            .as_mut()
            .ok_or(ClientError::NotConnected)?
            .set_header(name, value)
    }

    fn connected(&self) -> Result<&Transport, ServiceError> {
        Ok(self.transport.as_ref().ok_or(ClientError::NotConnected)?)
    }

    /// Sends one request and classifies the answer.
    ///
    /// Every verb operation delegates here. A success status returns the
    /// response with its body unread; anything else becomes a
    /// [`ServiceFailure`].
    ///
    /// ## Errors
    ///
    /// - [`ArgumentError::NullOrWhiteSpace`] for a blank `uri`
    /// - [`ClientError::NotConnected`] after [`dispose`](Self::dispose)
    /// - [`ClientError::Cancelled`] when `cancel` fires first
    /// - [`ServiceFailure`] for a non-success status
    #[instrument(
        name = "service_request",
        skip_all,
        fields(
            label = %label,
            http.method = %method,
            http.url = tracing::field::Empty,
            http.status_code = tracing::field::Empty,
            otel.kind = "client",
            otel.status_code = tracing::field::Empty,
        )
    )]
    pub async fn send(
        &self,
        method: RestMethod,
        uri: &str,
        content: Content,
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<Response, ServiceError> {
        ArgumentError::check_not_blank(uri, "request_uri")?;
        let transport = self.connected()?;

        let url = transport.resolve(uri)?;
        Span::current().record("http.url", url.as_str());

        let request = content.apply(transport.request(method, url));
        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ClientError::Cancelled.into()),
            response = request.send() => response?,
        };

        error_check(response, label).await
    }

    /// GET, returning the body.
    ///
    /// ## Errors
    ///
    /// Fails as [`send`](Self::send) does, or with [`ClientError::Request`]
    /// when the body cannot be read.
    pub async fn get(
        &self,
        uri: &str,
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<Bytes, ServiceError> {
        let response = self
            .send(RestMethod::Get, uri, Content::empty(), label, cancel)
            .await?;
        read_bytes(response, cancel).await
    }

    /// GET, returning the body as text.
    pub async fn get_string(
        &self,
        uri: &str,
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ServiceError> {
        let response = self
            .send(RestMethod::Get, uri, Content::empty(), label, cancel)
            .await?;
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(ClientError::Cancelled.into()),
            text = response.text() => Ok(text?),
        }
    }

    /// GET, returning the body as a stream of chunks.
    ///
    /// The status is classified before the stream is handed out; cancelling
    /// ends the stream with [`ClientError::Cancelled`].
    pub async fn get_stream(
        &self,
        uri: &str,
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<ByteStream, ServiceError> {
        let response = self
            .send(RestMethod::Get, uri, Content::empty(), label, cancel)
            .await?;

        let chunks = stream::unfold(Some((response, cancel.clone())), next_chunk);
        Ok(Box::pin(chunks))
    }

    /// GET used as an existence check: `404` yields `false`.
    pub async fn found(
        &self,
        uri: &str,
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<bool, ServiceError> {
        not_found_as_false(
            self.send(RestMethod::Get, uri, Content::empty(), label, cancel)
                .await,
        )
    }

    /// Streams the body of a GET into the file at `path`, returning the
    /// number of bytes written.
    ///
    /// ## Errors
    ///
    /// Fails as [`send`](Self::send) does, with [`ClientError::Io`] when the
    /// file cannot be written, or with [`ClientError::Cancelled`]. A download
    /// that fails after the file was created removes it again.
    pub async fn download(
        &self,
        uri: &str,
        path: impl AsRef<Path>,
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<u64, ServiceError> {
        let response = self
            .send(RestMethod::Get, uri, Content::empty(), label, cancel)
            .await?;
        write_to_file(response, path.as_ref(), cancel).await
    }

    /// Like [`download`](Self::download), but first resolves redirects and
    /// then downloads from the final location.
    pub async fn download_following_location(
        &self,
        uri: &str,
        path: impl AsRef<Path>,
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<u64, ServiceError> {
        let location = self
            .send(RestMethod::Get, uri, Content::empty(), label, cancel)
            .await?
            .url()
            .clone();
        debug!(%location, "downloading from resolved location");
        self.download(location.as_str(), path, label, cancel).await
    }

    /// PUT `content`, returning the response body.
    ///
    /// ## Errors
    ///
    /// Fails as [`send`](Self::send) does, or with [`ClientError::Request`]
    /// when the body cannot be read.
    pub async fn put(
        &self,
        uri: &str,
        content: Content,
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<Bytes, ServiceError> {
        let response = self.send(RestMethod::Put, uri, content, label, cancel).await?;
        read_bytes(response, cancel).await
    }

    /// POST `content`, returning the response body.
    ///
    /// ## Errors
    ///
    /// Fails as [`send`](Self::send) does, or with [`ClientError::Request`]
    /// when the body cannot be read.
    pub async fn post(
        &self,
        uri: &str,
        content: Content,
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<Bytes, ServiceError> {
        let response = self.send(RestMethod::Post, uri, content, label, cancel).await?;
        read_bytes(response, cancel).await
    }

    /// PATCH `content`, returning the response body.
    ///
    /// ## Errors
    ///
    /// Fails as [`send`](Self::send) does, or with [`ClientError::Request`]
    /// when the body cannot be read.
    pub async fn patch(
        &self,
        uri: &str,
        content: Content,
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<Bytes, ServiceError> {
        let response = self.send(RestMethod::Patch, uri, content, label, cancel).await?;
        read_bytes(response, cancel).await
    }

    /// PUT of a multipart form holding `uploads`.
    ///
    /// Each part is sent under the `file` field with its key as file name,
    /// together with `X-Atlassian-Token: nocheck`.
    pub async fn put_files(
        &self,
        uri: &str,
        uploads: Vec<Upload>,
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<Bytes, ServiceError> {
        self.put(uri, Content::files(uploads), label, cancel).await
    }

    /// POST counterpart of [`put_files`](Self::put_files).
    pub async fn post_files(
        &self,
        uri: &str,
        uploads: Vec<Upload>,
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<Bytes, ServiceError> {
        self.post(uri, Content::files(uploads), label, cancel).await
    }

    /// DELETE, returning the response body.
    ///
    /// ## Errors
    ///
    /// Fails as [`send`](Self::send) does, or with [`ClientError::Request`]
    /// when the body cannot be read.
    pub async fn delete(
        &self,
        uri: &str,
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<Bytes, ServiceError> {
        let response = self
            .send(RestMethod::Delete, uri, Content::empty(), label, cancel)
            .await?;
        read_bytes(response, cancel).await
    }

    /// DELETE that reports a missing resource as `false`.
    pub async fn delete_found(
        &self,
        uri: &str,
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<bool, ServiceError> {
        not_found_as_false(
            self.send(RestMethod::Delete, uri, Content::empty(), label, cancel)
                .await,
        )
    }
}

/// The single place where a response status becomes an error.
async fn error_check(response: Response, label: &str) -> Result<Response, ServiceError> {
    let status = response.status();
    Span::current().record("http.status_code", status.as_u16());

    if status.is_success() {
        Span::current().record("otel.status_code", "OK");
        return Ok(response);
    }

    let otel_status = if status.is_server_error() {
        "ERROR"
    } else {
        "UNSET"
    };
    Span::current().record("otel.status_code", otel_status);

    let request_uri = response.url().clone();
    let reason = reason_phrase(&response);
    // Body is diagnostic only; an unreadable body must not hide the status.
    let message = response.text().await.ok();
    warn!(
        status = status.as_u16(),
        reason = reason.as_deref().unwrap_or_default(),
        url = %request_uri,
        label,
        "service call failed"
    );
    Err(ServiceFailure::new(message, Some(request_uri), status, reason, label).into())
}

/// The reason phrase of the status line as the server sent it.
///
/// hyper only keeps phrases that differ from the canonical one, so the
/// canonical phrase stands in when none was recorded.
fn reason_phrase(response: &Response) -> Option<String> {
    response
        .extensions()
        .get::<ReasonPhrase>()
        .map(|phrase| String::from_utf8_lossy(phrase.as_bytes()).into_owned())
        .or_else(|| response.status().canonical_reason().map(str::to_string))
}

type ChunkState = Option<(Response, CancellationToken)>;

async fn next_chunk(state: ChunkState) -> Option<(Result<Bytes, ServiceError>, ChunkState)> {
    let (mut response, cancel) = state?;
    tokio::select! {
        biased;
        () = cancel.cancelled() => Some((Err(ClientError::Cancelled.into()), None)),
        chunk = response.chunk() => match chunk {
            Ok(Some(bytes)) => Some((Ok(bytes), Some((response, cancel)))),
            Ok(None) => None,
            Err(e) => Some((Err(e.into()), None)),
        },
    }
}

fn not_found_as_false(result: Result<Response, ServiceError>) -> Result<bool, ServiceError> {
    match result {
        Ok(_) => Ok(true),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e),
    }
}

async fn read_bytes(response: Response, cancel: &CancellationToken) -> Result<Bytes, ServiceError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ClientError::Cancelled.into()),
        body = response.bytes() => Ok(body?),
    }
}

/// Streams `response` into a new file at `path`.
///
/// A download that fails or is cancelled part way removes the partial file.
async fn write_to_file(
    response: Response,
    path: &Path,
    cancel: &CancellationToken,
) -> Result<u64, ServiceError> {
    let file = tokio::fs::File::create(path).await?;
    match copy_chunks(response, file, cancel).await {
        Ok(written) => {
            debug!(path = %path.display(), bytes = written, "download complete");
            Ok(written)
        }
        Err(e) => {
            if let Err(remove) = tokio::fs::remove_file(path).await {
                warn!(path = %path.display(), error = %remove, "failed to remove partial download");
            }
            Err(e)
        }
    }
}

async fn copy_chunks(
    mut response: Response,
    mut file: tokio::fs::File,
    cancel: &CancellationToken,
) -> Result<u64, ServiceError> {
    let mut written = 0u64;
    loop {
        let chunk = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ClientError::Cancelled.into()),
            chunk = response.chunk() => chunk?,
        };
        let Some(chunk) = chunk else { break };
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

async fn verify(transport: &Transport, path: &str) -> Result<(), ServiceError> {
    let response = transport.get(path).await?;
    let status = response.status();
    if !status.is_success() {
        warn!(url = %response.url(), status = status.as_u16(), "authentication verification failed");
        return Err(AuthError::VerificationFailed {
            url: response.url().to_string(),
            status: status.as_u16(),
        }
        .into());
    }
    debug!(url = %response.url(), "authentication verified");
    Ok(())
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{BearerAuthenticator, TokenAuthenticator};
    use futures::TryStreamExt;
    use reqwest::StatusCode;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn connect(server: &MockServer) -> ServiceConnection {
        ServiceConnection::builder(Url::parse(&server.uri()).unwrap())
            .build()
            .await
            .unwrap()
    }

    /// Answers one request with the raw bytes of `response`, then closes.
    async fn serve_raw(response: &'static [u8]) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response).await.unwrap();
            let _ = socket.shutdown().await;
        });
        Url::parse(&format!("http://{addr}/")).unwrap()
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let url = with_trailing_slash(Url::parse("https://example.com/rest/api").unwrap());
        assert_eq!(url.as_str(), "https://example.com/rest/api/");
        let url = with_trailing_slash(Url::parse("https://example.com").unwrap());
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[tokio::test]
    async fn test_get_string() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/issue/1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
            .mount(&server)
            .await;

        let connection =
            ServiceConnection::builder(Url::parse(&format!("{}/rest", server.uri())).unwrap())
                .build()
                .await
                .unwrap();
        let cancel = CancellationToken::new();
        let body = connection
            .get_string("issue/1", "get_issue", &cancel)
            .await
            .unwrap();
        assert_eq!(body, "hello");
    }

    #[tokio::test]
    async fn test_default_user_agent_and_app_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("user-agent", DEFAULT_USER_AGENT))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(header("user-agent", "IssueSync"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let cancel = CancellationToken::new();
        let plain = connect(&server).await;
        plain.get("a", "plain", &cancel).await.unwrap();

        let named = ServiceConnection::builder(Url::parse(&server.uri()).unwrap())
            .app_name("IssueSync")
            .build()
            .await
            .unwrap();
        named.get("b", "named", &cancel).await.unwrap();
    }

    #[tokio::test]
    async fn test_server_error_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/boom"))
            .respond_with(ResponseTemplate::new(500).set_body_string("database offline"))
            .mount(&server)
            .await;

        let connection = connect(&server).await;
        let err = connection
            .get("boom", "load_boom", &CancellationToken::new())
            .await
            .unwrap_err();

        let failure = err.as_failure().unwrap();
        assert_eq!(failure.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(failure.reason(), Some("Internal Server Error"));
        assert_eq!(failure.message(), Some("database offline"));
        assert_eq!(failure.label(), "load_boom");
        assert_eq!(
            failure.request_uri().map(Url::as_str),
            Some(format!("{}/boom", server.uri()).as_str())
        );
    }

    #[tokio::test]
    async fn test_server_reason_phrase_is_kept() {
        let base = serve_raw(
            b"HTTP/1.1 500 Internal Error\r\nContent-Length: 4\r\nConnection: close\r\n\r\nboom",
        )
        .await;

        let connection = ServiceConnection::builder(base).build().await.unwrap();
        let err = connection
            .get("x", "load_x", &CancellationToken::new())
            .await
            .unwrap_err();

        let failure = err.as_failure().unwrap();
        assert_eq!(failure.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(failure.reason(), Some("Internal Error"));
        assert_eq!(failure.message(), Some("boom"));
        assert_eq!(failure.label(), "load_x");
        assert!(err.to_string().starts_with("500 Internal Error: "));
    }

    #[tokio::test]
    async fn test_found_maps_not_found_to_false() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/present"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/forbidden"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let connection = connect(&server).await;
        let cancel = CancellationToken::new();
        assert!(connection.found("present", "found", &cancel).await.unwrap());
        assert!(!connection.found("missing", "found", &cancel).await.unwrap());
        assert!(!connection.delete_found("gone", "delete", &cancel).await.unwrap());

        let err = connection
            .found("forbidden", "found", &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
    }

    #[tokio::test]
    async fn test_disposed_connection_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut connection = connect(&server).await;
        assert!(connection.is_connected());
        connection.dispose();
        connection.dispose();
        assert!(!connection.is_connected());

        let cancel = CancellationToken::new();
        let err = connection.get("any", "after_dispose", &cancel).await.unwrap_err();
        assert!(err.is_not_connected());
        let err = connection.found("any", "after_dispose", &cancel).await.unwrap_err();
        assert!(err.is_not_connected());
    }

    #[tokio::test]
    async fn test_blank_uri_is_rejected() {
        let server = MockServer::start().await;
        let connection = connect(&server).await;
        let err = connection
            .get("  ", "blank", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Argument(ArgumentError::NullOrWhiteSpace { param: "request_uri" })
        ));
    }

    #[tokio::test]
    async fn test_cancelled_before_send() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let connection = connect(&server).await;
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = connection.get("slow", "cancelled", &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_authenticator_headers_are_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("authorization", "Bearer tok"))
            .and(header("x-trace", "on"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let connection = ServiceConnection::builder(Url::parse(&server.uri()).unwrap())
            .default_header("X-Trace", "on")
            .authenticator(Arc::new(BearerAuthenticator::new("tok")))
            .build()
            .await
            .unwrap();
        assert!(connection.authenticator().is_some());
        connection
            .get("me", "whoami", &CancellationToken::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_authenticator_overrides_default_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("x-key", "from-auth"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let connection = ServiceConnection::builder(Url::parse(&server.uri()).unwrap())
            .default_header("X-Key", "from-builder")
            .authenticator(Arc::new(TokenAuthenticator::new("X-Key", "from-auth")))
            .build()
            .await
            .unwrap();
        connection
            .get("x", "override", &CancellationToken::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_verification_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/myself"))
            .and(header("authorization", "Bearer good"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/myself"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let base = Url::parse(&server.uri()).unwrap();
        let ok = ServiceConnection::builder(base.clone())
            .authenticator(Arc::new(BearerAuthenticator::new("good")))
            .verify_path("myself")
            .build()
            .await;
        assert!(ok.is_ok());

        let err = ServiceConnection::builder(base)
            .authenticator(Arc::new(BearerAuthenticator::new("bad")))
            .verify_path("myself")
            .build()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Auth(AuthError::VerificationFailed { status: 401, .. })
        ));
    }

    #[tokio::test]
    async fn test_download_writes_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/report.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"line one\nline two\n".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("report.txt");
        let connection = connect(&server).await;
        let written = connection
            .download("files/report.txt", &target, "download", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(written, 18);
        assert_eq!(
            tokio::fs::read_to_string(&target).await.unwrap(),
            "line one\nline two\n"
        );
    }

    #[tokio::test]
    async fn test_truncated_download_leaves_no_file() {
        let base = serve_raw(
            b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\npartial",
        )
        .await;

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("report.txt");
        let connection = ServiceConnection::builder(base).build().await.unwrap();
        let err = connection
            .download("report.txt", &target, "download", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Client(ClientError::Request(_))));
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_download_following_location() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("location", format!("{}/artifacts/v2.zip", server.uri())),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/artifacts/v2.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK".to_vec()))
            .expect(2)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("v2.zip");
        let connection = connect(&server).await;
        connection
            .download_following_location("latest", &target, "fetch_latest", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(tokio::fs::read(&target).await.unwrap(), b"PK");
    }

    #[tokio::test]
    async fn test_post_files_is_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/issue/DEMO-1/attachments"))
            .and(header("x-atlassian-token", "nocheck"))
            .and(body_string_contains("name=\"file\""))
            .and(body_string_contains("filename=\"notes.txt\""))
            .and(body_string_contains("attached text"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .expect(1)
            .mount(&server)
            .await;

        let connection = connect(&server).await;
        let body = connection
            .post_files(
                "issue/DEMO-1/attachments",
                vec![Upload::bytes("notes.txt", "attached text")],
                "add_attachment",
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(&body[..], b"[]");
    }

    #[tokio::test]
    async fn test_put_sends_content() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/settings"))
            .and(header("content-type", "application/json"))
            .and(body_string_contains("\"mode\":\"dark\""))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let connection = connect(&server).await;
        let body = connection
            .put(
                "settings",
                Content::json(r#"{"mode":"dark"}"#),
                "save_settings",
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_get_stream_yields_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/log"))
            .respond_with(ResponseTemplate::new(200).set_body_string("0123456789"))
            .mount(&server)
            .await;

        let connection = connect(&server).await;
        let chunks: Vec<Bytes> = connection
            .get_stream("log", "tail_log", &CancellationToken::new())
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(chunks.concat(), b"0123456789");
    }

    #[tokio::test]
    async fn test_absolute_uri_bypasses_base() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/elsewhere"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let connection =
            ServiceConnection::builder(Url::parse(&format!("{}/api/v2", server.uri())).unwrap())
                .build()
                .await
                .unwrap();
        let body = connection
            .get_string(
                &format!("{}/elsewhere", server.uri()),
                "absolute",
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_failures_are_logged_with_label() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let connection = connect(&server).await;
        let _ = connection
            .get("upstream", "check_upstream", &CancellationToken::new())
            .await;

        assert!(logs_contain("service_request"));
        assert!(logs_contain("service call failed"));
        assert!(logs_contain("check_upstream"));
        assert!(logs_contain("http.status_code=502"));
    }
}

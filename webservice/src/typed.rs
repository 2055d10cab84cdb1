//! Typed verb calls on top of a [`ServiceConnection`].

use std::sync::Arc;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::connection::{ServiceConnection, ServiceConnectionBuilder};
use crate::content::Content;
use crate::error::{ArgumentError, ServiceError};
use crate::serializer::{Format, SerializerRegistry, TypeSerializer};

const ACCEPT: &str = "Accept";

/// Builds a [`TypedService`] from a connection builder.
#[derive(Debug)]
pub struct TypedServiceBuilder {
    connection: ServiceConnectionBuilder,
    registry: Arc<SerializerRegistry>,
    accept: Format,
}

impl TypedServiceBuilder {
    /// Format requested through the `Accept` header. JSON by default.
    #[must_use]
    pub fn accept(mut self, format: Format) -> Self {
        self.accept = format;
        self
    }

    pub async fn build(self) -> Result<TypedService, ServiceError> {
        let connection = self
            .connection
            .default_header(ACCEPT, self.accept.content_type())
            .build()
            .await?;
        Ok(TypedService {
            connection,
            registry: self.registry,
        })
    }
}

/// A service connection that speaks Rust types instead of bytes.
///
/// Request bodies are encoded and responses decoded with the serializers in
/// the shared [`SerializerRegistry`]. Both lookups happen before anything is
/// sent, so a missing registration never costs a round trip.
///
/// ## Examples
///
/// ```rust,ignore
/// let registry = Arc::new(SerializerRegistry::new().with_json::<Issue>());
/// let service = TypedService::builder(ServiceConnection::builder(base), registry)
///     .build()
///     .await?;
///
/// let issue: Issue = service.get("rest/api/2/issue/DEMO-1", "get_issue", &cancel).await?;
/// ```
#[derive(Debug)]
pub struct TypedService {
    connection: ServiceConnection,
    registry: Arc<SerializerRegistry>,
}

impl TypedService {
    pub fn builder(
        connection: ServiceConnectionBuilder,
        registry: Arc<SerializerRegistry>,
    ) -> TypedServiceBuilder {
        TypedServiceBuilder {
            connection,
            registry,
            accept: Format::Json,
        }
    }

    /// Wraps an existing connection, adding `Accept: application/json`.
    ///
    /// ## Errors
    ///
    /// Returns [`ClientError::NotConnected`](crate::error::ClientError::NotConnected)
    /// if `connection` was already disposed.
    pub fn new(
        mut connection: ServiceConnection,
        registry: Arc<SerializerRegistry>,
    ) -> Result<Self, ServiceError> {
        connection.set_default_header(ACCEPT, Format::Json.content_type())?;
        Ok(Self {
            connection,
            registry,
        })
    }

    pub fn connection(&self) -> &ServiceConnection {
        &self.connection
    }

    pub fn connection_mut(&mut self) -> &mut ServiceConnection {
        &mut self.connection
    }

    pub fn registry(&self) -> &Arc<SerializerRegistry> {
        &self.registry
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Disposes the underlying connection.
    pub fn dispose(&mut self) {
        self.connection.dispose();
    }

    /// GET decoded as `R`.
    ///
    /// ## Errors
    ///
    /// - [`SerializationError::Unregistered`](crate::error::SerializationError::Unregistered)
    ///   before sending when `R` has no serializer
    /// - anything [`ServiceConnection::send`] returns
    /// - a decoding error when the body does not match `R`
    pub async fn get<R: 'static>(
        &self,
        uri: &str,
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<R, ServiceError> {
        let output = self.registry.get::<R>()?;
        let text = self.connection.get_string(uri, label, cancel).await?;
        trace_body("response", label, &text);
        Ok(output.decode(&text)?)
    }

    /// GET used as an existence check: `404` yields `false`.
    pub async fn found(
        &self,
        uri: &str,
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<bool, ServiceError> {
        self.connection.found(uri, label, cancel).await
    }

    /// PUT `body`, decoding the answer as `R`.
    pub async fn put<B: 'static, R: 'static>(
        &self,
        uri: &str,
        body: &B,
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<R, ServiceError> {
        let output = self.registry.get::<R>()?;
        let content = self.encode(body, label)?;
        let answer = self.connection.put(uri, content, label, cancel).await?;
        decode(output, &answer, label)
    }

    /// PUT `body`, ignoring the answer.
    pub async fn put_no_content<B: 'static>(
        &self,
        uri: &str,
        body: &B,
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<(), ServiceError> {
        let content = self.encode(body, label)?;
        self.connection.put(uri, content, label, cancel).await?;
        Ok(())
    }

    /// POST `body`, decoding the answer as `R`.
    pub async fn post<B: 'static, R: 'static>(
        &self,
        uri: &str,
        body: &B,
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<R, ServiceError> {
        let output = self.registry.get::<R>()?;
        let content = self.encode(body, label)?;
        let answer = self.connection.post(uri, content, label, cancel).await?;
        decode(output, &answer, label)
    }

    /// POST `body`, ignoring the answer.
    pub async fn post_no_content<B: 'static>(
        &self,
        uri: &str,
        body: &B,
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<(), ServiceError> {
        let content = self.encode(body, label)?;
        self.connection.post(uri, content, label, cancel).await?;
        Ok(())
    }

    /// PATCH `body`, decoding the answer as `R`.
    pub async fn patch<B: 'static, R: 'static>(
        &self,
        uri: &str,
        body: &B,
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<R, ServiceError> {
        let output = self.registry.get::<R>()?;
        let content = self.encode(body, label)?;
        let answer = self.connection.patch(uri, content, label, cancel).await?;
        decode(output, &answer, label)
    }

    /// PATCH `body`, ignoring the answer.
    pub async fn patch_no_content<B: 'static>(
        &self,
        uri: &str,
        body: &B,
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<(), ServiceError> {
        let content = self.encode(body, label)?;
        self.connection.patch(uri, content, label, cancel).await?;
        Ok(())
    }

    /// DELETE, decoding the answer as `R`.
    pub async fn delete<R: 'static>(
        &self,
        uri: &str,
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<R, ServiceError> {
        let output = self.registry.get::<R>()?;
        let answer = self.connection.delete(uri, label, cancel).await?;
        decode(output, &answer, label)
    }

    /// DELETE, ignoring the answer.
    pub async fn delete_no_content(
        &self,
        uri: &str,
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<(), ServiceError> {
        self.connection.delete(uri, label, cancel).await?;
        Ok(())
    }

    /// DELETE that reports a missing resource as `false`.
    pub async fn delete_found(
        &self,
        uri: &str,
        label: &str,
        cancel: &CancellationToken,
    ) -> Result<bool, ServiceError> {
        self.connection.delete_found(uri, label, cancel).await
    }

    fn encode<B: 'static>(&self, body: &B, label: &str) -> Result<Content, ServiceError> {
        let input = self.registry.get::<B>()?;
        let text = input.encode(body)?;
        if input.format().is_empty_body(&text) {
            return Err(ArgumentError::MissingBody { param: "body" }.into());
        }
        trace_body("request", label, &text);
        Ok(Content::bytes(text, Some(input.format().content_type())))
    }
}

fn decode<R>(output: &TypeSerializer<R>, body: &Bytes, label: &str) -> Result<R, ServiceError> {
    let text = String::from_utf8_lossy(body);
    trace_body("response", label, &text);
    Ok(output.decode(&text)?)
}

#[cfg(debug_assertions)]
fn trace_body(direction: &'static str, label: &str, body: &str) {
    tracing::trace!(direction, label, body, "typed body");
}

#[cfg(not(debug_assertions))]
fn trace_body(_direction: &'static str, _label: &str, _body: &str) {}

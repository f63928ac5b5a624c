//! Transport seam between the client core and the HTTP layer.
//!
//! The core never talks to the network directly. Queries, `Entity::save` and
//! `Entity::delete` describe the request as a [`TransportRequest`] and hand it
//! to a [`Transport`], which returns the raw JSON response body.

use crate::document::Document;
use crate::params::QueryParams;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Media type mandated by the JSON:API specification.
pub const JSONAPI_MEDIA_TYPE: &str = "application/vnd.api+json";

/// Join `segments` into a request path, percent-encoding each one.
///
/// `resource_path(["articles", "a/b"])` is `/articles/a%2Fb`.
pub(crate) fn resource_path<'s>(segments: impl IntoIterator<Item = &'s str>) -> String {
    let mut path = String::new();
    for segment in segments {
        path.push('/');
        path.push_str(&urlencoding::encode(segment));
    }
    path
}

/// A request the core wants the transport to perform.
#[derive(Clone, Debug, PartialEq)]
pub struct TransportRequest {
    pub method: http::Method,
    /// Path relative to the transport's base URL, e.g. `/articles/1`.
    pub path: String,
    pub params: QueryParams,
    pub body: Option<Document>,
}

impl TransportRequest {
    #[must_use]
    pub fn new(method: http::Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: QueryParams::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: QueryParams) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Document) -> Self {
        self.body = Some(body);
        self
    }
}

/// Network or HTTP-layer failure reported by a [`Transport`].
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TransportError {
    /// The server answered with a non-2xx status.
    ///
    /// `body` holds the parsed JSON body, or the raw text as a JSON string when
    /// the body was not JSON.
    #[error("HTTP {status}: {body}")]
    Status {
        status: http::StatusCode,
        body: serde_json::Value,
    },

    /// The request did not complete in time.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The request URL could not be built.
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The request could not be built (bad header, bad URI).
    #[error("failed to build request: {0}")]
    Request(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Connection-level failure (DNS, refused, TLS, reset).
    #[error("connection error: {0}")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The response body could not be read or parsed.
    #[error("failed to read response body: {0}")]
    Body(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Performs HTTP requests on behalf of the client.
///
/// Implementations return the response body as JSON; an empty body is
/// returned as `serde_json::Value::Null`. Non-2xx responses must be reported
/// as [`TransportError::Status`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and return the raw response body.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] for any network or HTTP-layer failure.
    async fn send(&self, request: TransportRequest) -> Result<serde_json::Value, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: TransportRequest) -> Result<serde_json::Value, TransportError> {
        (**self).send(request).await
    }
}

//! Hyper-based [`Transport`] implementation.

use crate::config::{HttpTransportConfig, TlsRoots};
use crate::tls;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE, HeaderName, HeaderValue, USER_AGENT};
use http::{HeaderMap, Request, StatusCode, Uri};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use jsonapi_client::{JSONAPI_MEDIA_TYPE, Transport, TransportError, TransportRequest};
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

type HyperClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// Response body exceeded the configured limit.
#[derive(Error, Debug)]
#[error("response body too large: {actual} bytes exceeds limit of {limit}")]
pub struct BodyTooLarge {
    pub limit: usize,
    pub actual: usize,
}

/// Sends JSON:API requests over HTTP/1.1 or HTTP/2, with or without TLS.
///
/// Request paths from the client core are appended to the configured base
/// URL; query parameters are flattened with
/// [`QueryParams::to_pairs`](jsonapi_client::QueryParams::to_pairs).
///
/// ```rust,ignore
/// let transport = HttpTransport::new(&HttpTransportConfig::new("https://api.example.com"))?;
/// let articles = registry.model("articles").expect("registered");
/// let list = articles.find(None).execute(&transport).await?.into_many();
/// ```
#[derive(Clone)]
pub struct HttpTransport {
    client: HyperClient,
    base_url: Url,
    headers: HeaderMap,
    request_timeout: Duration,
    max_body_size: usize,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url.as_str())
            .field("request_timeout", &self.request_timeout)
            .field("max_body_size", &self.max_body_size)
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Build a transport from `config`.
    ///
    /// # Errors
    ///
    /// - [`TransportError::InvalidUrl`] if `base_url` is not an absolute
    ///   `http` or `https` URL
    /// - [`TransportError::Request`] if a configured header is invalid
    /// - [`TransportError::Connection`] if TLS cannot be configured
    pub fn new(config: &HttpTransportConfig) -> Result<Self, TransportError> {
        let base_url = parse_base_url(&config.base_url)?;
        let headers = default_headers(config)?;
        let connector = build_https_connector(config.tls_roots)?;

        let mut builder = Client::builder(TokioExecutor::new());
        builder.pool_timer(TokioTimer::new());
        let client = builder.build::<_, Full<Bytes>>(connector);

        Ok(Self {
            client,
            base_url,
            headers,
            request_timeout: config.request_timeout,
            max_body_size: config.max_body_size,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, request: &TransportRequest) -> Result<Url, TransportError> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            request.path.trim_start_matches('/')
        );
        let mut url = Url::parse(&joined).map_err(|e| TransportError::InvalidUrl {
            url: joined.clone(),
            reason: e.to_string(),
        })?;

        let pairs = request.params.to_pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        Ok(url)
    }

    fn build_request(
        &self,
        url: &Url,
        request: TransportRequest,
    ) -> Result<Request<Full<Bytes>>, TransportError> {
        let uri: Uri = url
            .as_str()
            .parse()
            .map_err(|e| TransportError::Request(Box::new(e)))?;

        let body = match &request.body {
            Some(document) => serde_json::to_vec(document)
                .map(Bytes::from)
                .map_err(|e| TransportError::Request(Box::new(e)))?,
            None => Bytes::new(),
        };

        let mut http_request = Request::new(Full::new(body));
        *http_request.method_mut() = request.method;
        *http_request.uri_mut() = uri;
        let headers = http_request.headers_mut();
        headers.extend(self.headers.clone());
        if request.body.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSONAPI_MEDIA_TYPE));
        }
        Ok(http_request)
    }

    async fn perform(
        &self,
        request: Request<Full<Bytes>>,
    ) -> Result<(StatusCode, Bytes), TransportError> {
        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| TransportError::Connection(Box::new(e)))?;
        let status = response.status();
        let body = read_body_limited(response.into_body(), self.max_body_size).await?;
        Ok((status, body))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<serde_json::Value, TransportError> {
        let url = self.url_for(&request)?;
        let method = request.method.clone();
        let http_request = self.build_request(&url, request)?;

        let started = Instant::now();
        let (status, body) = tokio::time::timeout(self.request_timeout, self.perform(http_request))
            .await
            .map_err(|_| TransportError::Timeout(self.request_timeout))??;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        if !status.is_success() {
            tracing::warn!(
                method = %method,
                path = url.path(),
                status = status.as_u16(),
                elapsed_ms,
                "JSON:API request failed"
            );
            let body = parse_body(&body)
                .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(&body).into_owned()));
            return Err(TransportError::Status { status, body });
        }

        tracing::debug!(
            method = %method,
            path = url.path(),
            status = status.as_u16(),
            bytes = body.len(),
            elapsed_ms,
            "JSON:API request completed"
        );
        parse_body(&body).map_err(|e| TransportError::Body(Box::new(e)))
    }
}

fn parse_base_url(raw: &str) -> Result<Url, TransportError> {
    let url = Url::parse(raw).map_err(|e| TransportError::InvalidUrl {
        url: raw.to_owned(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(TransportError::InvalidUrl {
            url: raw.to_owned(),
            reason: format!("unsupported scheme '{scheme}'"),
        }),
    }
}

fn default_headers(config: &HttpTransportConfig) -> Result<HeaderMap, TransportError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(JSONAPI_MEDIA_TYPE));
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&config.user_agent).map_err(|e| TransportError::Request(Box::new(e)))?,
    );
    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::Request(Box::new(e)))?;
        let value =
            HeaderValue::from_str(value).map_err(|e| TransportError::Request(Box::new(e)))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

fn build_https_connector(roots: TlsRoots) -> Result<HttpsConnector<HttpConnector>, TransportError> {
    let builder = match roots {
        TlsRoots::WebPki => hyper_rustls::HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(tls::crypto_provider())
            .map_err(|e| TransportError::Connection(Box::new(e)))?,
        TlsRoots::Native => {
            let config =
                tls::native_roots_client_config().map_err(|e| TransportError::Connection(e.into()))?;
            hyper_rustls::HttpsConnectorBuilder::new().with_tls_config(config)
        }
    };
    Ok(builder.https_or_http().enable_all_versions().build())
}

async fn read_body_limited(body: Incoming, limit: usize) -> Result<Bytes, TransportError> {
    let mut collected = Vec::new();
    let mut body = std::pin::pin!(body);

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(|e| TransportError::Body(Box::new(e)))?;
        let Some(chunk) = frame.data_ref() else {
            continue;
        };
        let actual = collected.len() + chunk.len();
        if actual > limit {
            return Err(TransportError::Body(Box::new(BodyTooLarge { limit, actual })));
        }
        collected.extend_from_slice(chunk);
    }

    Ok(Bytes::from(collected))
}

/// An empty (or whitespace-only) body decodes as `null`.
fn parse_body(bytes: &[u8]) -> Result<serde_json::Value, serde_json::Error> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::Value::Null);
    }
    serde_json::from_slice(bytes)
}

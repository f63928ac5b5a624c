//! Configuration for [`HttpTransport`](crate::HttpTransport).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Source of root certificates for HTTPS connections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TlsRoots {
    /// Mozilla root set compiled into the binary.
    #[default]
    WebPki,
    /// OS certificate store, loaded once per process.
    Native,
}

/// HTTP transport configuration.
///
/// ```yaml
/// base_url: https://api.example.com/v1
/// request_timeout: 10s
/// headers:
///   Authorization: Bearer abc
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpTransportConfig {
    /// Base URL every request path is appended to.
    pub base_url: String,

    /// Extra headers sent with every request.
    pub headers: BTreeMap<String, String>,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Deadline for one request, including reading the body.
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Maximum response body size in bytes.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    pub tls_roots: TlsRoots,
}

fn default_user_agent() -> String {
    concat!("jsonapi-http/", env!("CARGO_PKG_VERSION")).to_owned()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_body_size() -> usize {
    10 * 1024 * 1024
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            headers: BTreeMap::new(),
            user_agent: default_user_agent(),
            request_timeout: default_request_timeout(),
            max_body_size: default_max_body_size(),
            tls_roots: TlsRoots::default(),
        }
    }
}

impl HttpTransportConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn max_body_size(mut self, limit: usize) -> Self {
        self.max_body_size = limit;
        self
    }
}

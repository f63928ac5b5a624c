#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Hyper-based HTTP transport for [`jsonapi_client`].
//!
//! ```rust,ignore
//! use jsonapi_http::{HttpTransport, HttpTransportConfig};
//!
//! let transport = HttpTransport::new(
//!     &HttpTransportConfig::new("https://api.example.com/v1")
//!         .header("Authorization", "Bearer abc"),
//! )?;
//! let articles = registry.model("articles").expect("registered");
//! let page = articles.find(None).limit(20).execute(&transport).await?;
//! ```

pub mod config;
pub mod tls;
pub mod transport;

pub use config::{HttpTransportConfig, TlsRoots};
pub use transport::{BodyTooLarge, HttpTransport};

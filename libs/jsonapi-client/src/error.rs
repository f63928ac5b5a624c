use crate::transport::TransportError;
use thiserror::Error;

/// Errors surfaced by the JSON:API client.
///
/// Every failure propagates to the immediate caller unchanged; nothing in this
/// crate retries, suppresses or logs an error it returns.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A resource or relationship identifier names a type with no registered schema.
    #[error("resource type '{type_name}' is not registered")]
    UnregisteredType { type_name: String },

    /// A relationship identifier has no matching entry in the document's `included` array.
    #[error("included resource '{type_name}/{id}' not found in compound document")]
    MissingIncludedResource { type_name: String, id: String },

    /// The transport failed (network, timeout, non-2xx status).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The response body is not a JSON:API document.
    #[error("invalid JSON:API document: {0}")]
    InvalidDocument(#[from] serde_json::Error),

    /// The operation needs a resource id and none is set.
    #[error("resource of type '{type_name}' has no id")]
    MissingId { type_name: String },

    /// The query was executed before `find`, `find_by_id` or `get` selected an operation.
    #[error("query has no operation; call find, find_by_id or get first")]
    NoOperation,
}

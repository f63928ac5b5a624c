#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Typed client-side data mapper for JSON:API services.
//!
//! Declare a [`Schema`] per resource type, register them in a
//! [`TypeRegistry`], and work with [`Entity`] instances through the
//! [`Model`] handle of each type:
//!
//! ```rust,ignore
//! use jsonapi_client::{Attribute, Relationship, Schema, TypeRegistry};
//!
//! let registry = TypeRegistry::builder()
//!     .register(
//!         "articles",
//!         Schema::new()
//!             .attribute("title", Attribute::new())
//!             .attribute("createdAt", Attribute::new().wire_name("created-at").date())
//!             .relationship("author", Relationship::to("people")),
//!     )
//!     .register("people", Schema::new().attribute("name", Attribute::new()))
//!     .build();
//!
//! let articles = registry.model("articles").expect("registered");
//! let mut article = articles
//!     .find_by_id("1", None)
//!     .include("author")
//!     .execute(&transport)
//!     .await?
//!     .into_one()
//!     .expect("article 1");
//!
//! article.set("title", "Updated");
//! article.save(&transport).await?; // PATCH /articles/1 with only `title`
//! ```

pub mod codec;
pub mod document;
pub mod entity;
pub mod error;
pub mod merge;
pub mod model;
pub mod params;
pub mod query;
pub mod registry;
pub mod schema;
pub mod transport;
pub mod value;

pub use codec::{DecodeOptions, Decoded, MissingIncluded, decode, encode};
pub use document::{Document, Identifier, PrimaryData, RelationshipData, RelationshipObject, Resource};
pub use entity::{Entity, GetOptions, SetOptions, ToObjectOptions};
pub use error::Error;
pub use model::Model;
pub use params::QueryParams;
pub use query::{
    BoundQuery, Filter, Include, IncludeTree, Operation, Query, QueryOptions, QueryOutput, RawResult,
    Sort, SortDir,
};
pub use registry::{ResourceDef, TypeRegistry, TypeRegistryBuilder};
pub use schema::{Attribute, AttributeKind, DefaultValue, Relationship, Schema};
pub use transport::{JSONAPI_MEDIA_TYPE, Transport, TransportError, TransportRequest};
pub use value::Value;

//! Per-type handles over the type registry.

use crate::codec::{self, DecodeOptions, Decoded};
use crate::document::Document;
use crate::entity::Entity;
use crate::error::Error;
use crate::query::{Filter, Query};
use crate::registry::{ResourceDef, TypeRegistry};
use crate::schema::Schema;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Handle to one registered resource type.
///
/// A `Model` closes over the resource definition and the registry it was
/// registered in. It constructs entities, decodes documents whose primary
/// data is of its type, and starts queries. Cloning is cheap.
#[derive(Clone)]
pub struct Model {
    def: Arc<ResourceDef>,
    registry: Arc<TypeRegistry>,
}

impl Model {
    pub(crate) fn new(def: Arc<ResourceDef>, registry: Arc<TypeRegistry>) -> Self {
        Self { def, registry }
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        self.def.type_name()
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        self.def.schema()
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// A new, unsaved entity with schema defaults applied.
    #[must_use]
    pub fn create(&self) -> Entity {
        Entity::construct(self.clone(), Value::Null, true)
    }

    /// A new, unsaved entity initialized from `obj`.
    ///
    /// `obj` is a map of field name to value (typically `json!({...})`).
    /// The `type` and `id` members set the entity's identity; every other
    /// member is set through the field's setter without marking it modified.
    /// Non-object input is ignored.
    #[must_use]
    pub fn build(&self, obj: impl Into<Value>) -> Entity {
        Entity::construct(self.clone(), obj.into(), true)
    }

    /// Like [`Model::build`], but the entity is treated as already persisted.
    #[must_use]
    pub fn build_persisted(&self, obj: impl Into<Value>) -> Entity {
        Entity::construct(self.clone(), obj.into(), false)
    }

    /// Decode a document whose primary data is of this type.
    ///
    /// The primary resource is decoded with this model regardless of the
    /// `type` it carries; related resources resolve through the registry.
    ///
    /// # Errors
    ///
    /// See [`codec::decode`].
    pub fn decode(&self, document: &Document) -> Result<Decoded, Error> {
        self.decode_with(document, DecodeOptions::default())
    }

    /// [`Model::decode`] with explicit decode options.
    ///
    /// # Errors
    ///
    /// See [`codec::decode`].
    pub fn decode_with(&self, document: &Document, options: DecodeOptions) -> Result<Decoded, Error> {
        codec::decode_as(self, document, options)
    }

    /// Query the collection: `GET /{type}`.
    #[must_use]
    pub fn find(&self, filter: Option<Filter>) -> Query {
        Query::new(self.clone()).find(filter)
    }

    /// Query one resource: `GET /{type}/{id}`.
    #[must_use]
    pub fn find_by_id(&self, id: impl Into<String>, filter: Option<Filter>) -> Query {
        Query::new(self.clone()).find_by_id(id, filter)
    }

    /// An empty query against this type.
    #[must_use]
    pub fn query(&self) -> Query {
        Query::new(self.clone())
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("type_name", &self.type_name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::schema::Attribute;
    use serde_json::json;

    fn people() -> Model {
        TypeRegistry::builder()
            .register(
                "people",
                Schema::new()
                    .attribute("name", Attribute::new())
                    .attribute("role", Attribute::new().default_value("member")),
            )
            .build()
            .model("people")
            .unwrap()
    }

    #[test]
    fn test_create_and_build() {
        let people = people();

        let created = people.create();
        assert!(created.is_new());
        assert_eq!(created.type_name(), "people");
        assert_eq!(created.get("role"), Some(Value::from("member")));
        assert!(!created.is_any_modified());

        let built = people.build(json!({"name": "Ann"}));
        assert!(built.is_new());
        assert_eq!(built.get("name"), Some(Value::from("Ann")));

        let persisted = people.build_persisted(json!({"id": "3", "name": "Ann"}));
        assert!(!persisted.is_new());
        assert_eq!(persisted.id(), Some("3"));
    }

    #[test]
    fn test_find_selects_operation() {
        let people = people();
        assert_eq!(people.find(None).options().op, Some(crate::query::Operation::Find));
        assert_eq!(people.find_by_id("3", None).options().id.as_deref(), Some("3"));
        assert_eq!(people.query().options().op, None);
    }
}

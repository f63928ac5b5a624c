//! Registry of resource types.
//!
//! The registry maps a JSON:API resource type name to its [`Schema`]. It is
//! built once by an explicit registration step and is immutable afterwards,
//! so it can be shared across threads through an `Arc` without locking.
//!
//! ```rust,ignore
//! let registry = TypeRegistry::builder()
//!     .register("articles", article_schema())
//!     .register("people", people_schema())
//!     .build();
//!
//! let articles = registry.model("articles").expect("registered");
//! ```

use crate::model::Model;
use crate::schema::Schema;
use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A registered resource type: its name and schema.
#[derive(Debug)]
pub struct ResourceDef {
    type_name: String,
    schema: Schema,
}

impl ResourceDef {
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

/// Immutable map from resource type name to its definition.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: HashMap<String, Arc<ResourceDef>>,
}

impl TypeRegistry {
    #[must_use]
    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder::default()
    }

    #[must_use]
    pub fn get(&self, type_name: &str) -> Option<&Arc<ResourceDef>> {
        self.types.get(type_name)
    }

    #[must_use]
    pub fn schema(&self, type_name: &str) -> Option<&Schema> {
        self.get(type_name).map(|def| def.schema())
    }

    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Registered type names, in no particular order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// The [`Model`] bound to `type_name`, or `None` when it is not registered.
    #[must_use]
    pub fn model(self: &Arc<Self>, type_name: &str) -> Option<Model> {
        self.get(type_name)
            .map(|def| Model::new(Arc::clone(def), Arc::clone(self)))
    }

    /// Promote loosely-typed relationship input to entities.
    ///
    /// A `Value::Object` whose `type` member names a registered type becomes a
    /// new entity of that type built from the object. In an array, each
    /// promotable element is promoted and the rest are kept as they are.
    /// Other values pass through unchanged.
    pub(crate) fn hydrate(self: &Arc<Self>, value: Value) -> Value {
        match value {
            Value::Object(_) => self.promote(value),
            Value::Array(items) => {
                Value::Array(items.into_iter().map(|item| self.promote(item)).collect())
            }
            other => other,
        }
    }

    fn promote(self: &Arc<Self>, value: Value) -> Value {
        let model = match &value {
            Value::Object(map) => map
                .get("type")
                .and_then(Value::as_str)
                .and_then(|type_name| self.model(type_name)),
            _ => None,
        };
        match model {
            Some(model) => Value::from(model.build(value)),
            None => value,
        }
    }
}

/// Collects resource definitions before the registry is frozen.
#[derive(Debug, Default)]
pub struct TypeRegistryBuilder {
    types: HashMap<String, Arc<ResourceDef>>,
}

impl TypeRegistryBuilder {
    /// Register `schema` under `type_name`. Registering the same name again
    /// replaces the earlier definition.
    #[must_use]
    pub fn register(mut self, type_name: impl Into<String>, schema: Schema) -> Self {
        let type_name = type_name.into();
        tracing::trace!(type_name = %type_name, "registering resource type");
        self.types.insert(
            type_name.clone(),
            Arc::new(ResourceDef { type_name, schema }),
        );
        self
    }

    #[must_use]
    pub fn build(self) -> Arc<TypeRegistry> {
        Arc::new(TypeRegistry { types: self.types })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::schema::Attribute;
    use serde_json::json;

    fn registry() -> Arc<TypeRegistry> {
        TypeRegistry::builder()
            .register("people", Schema::new().attribute("name", Attribute::new()))
            .build()
    }

    #[test]
    fn test_model_lookup() {
        let registry = registry();
        assert!(registry.contains("people"));
        assert!(registry.model("people").is_some());
        assert!(registry.model("tags").is_none());
        assert_eq!(registry.type_names().collect::<Vec<_>>(), ["people"]);
    }

    #[test]
    fn test_register_twice_replaces() {
        let registry = TypeRegistry::builder()
            .register("people", Schema::new().attribute("name", Attribute::new()))
            .register("people", Schema::new().attribute("email", Attribute::new()))
            .build();
        let schema = registry.schema("people").unwrap();
        assert!(schema.get_attribute("name").is_none());
        assert!(schema.get_attribute("email").is_some());
    }

    #[test]
    fn test_hydrate_promotes_registered_objects_only() {
        let registry = registry();

        let promoted = registry.hydrate(Value::from(json!({"type": "people", "id": "9", "name": "Dan"})));
        let person = promoted.as_entity().unwrap();
        assert_eq!(person.id(), Some("9"));
        assert_eq!(person.get("name"), Some(Value::from("Dan")));

        let unknown = Value::from(json!({"type": "tags", "id": "1"}));
        assert_eq!(registry.hydrate(unknown.clone()), unknown);

        let mixed = registry.hydrate(Value::from(json!([
            {"type": "people", "id": "1"},
            "plain"
        ])));
        let items = mixed.as_array().unwrap();
        assert!(items[0].as_entity().is_some());
        assert_eq!(items[1], Value::from("plain"));
    }
}

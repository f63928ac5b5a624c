//! Entity instances and their dirty tracking.
//!
//! An [`Entity`] is one addressable resource: a type, an optional id, a field
//! store keyed by field name, and the set of fields modified since it was
//! constructed or last saved. Fields are read and written through
//! [`Entity::get`] and [`Entity::set`], which apply the schema's getters,
//! setters and coercions.

use crate::codec;
use crate::document::{Document, Identifier, PrimaryData};
use crate::error::Error;
use crate::model::Model;
use crate::schema::{AttributeKind, FieldDef, Schema};
use crate::transport::{Transport, TransportRequest, resource_path};
use crate::value::Value;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Options for [`Entity::get_with`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GetOptions {
    /// Apply the field's getter (default `true`).
    pub getter: bool,
}

impl Default for GetOptions {
    fn default() -> Self {
        Self { getter: true }
    }
}

/// Options for [`Entity::set_with`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SetOptions {
    /// Apply coercion, relationship promotion and the field's setter (default `true`).
    pub setter: bool,
    /// Do not add the field to the modified set (default `false`).
    pub skip_mark_modified: bool,
}

impl SetOptions {
    /// Setter applied, field not marked modified. Used for defaults and decode.
    #[must_use]
    pub const fn silent() -> Self {
        Self {
            setter: true,
            skip_mark_modified: true,
        }
    }
}

impl Default for SetOptions {
    fn default() -> Self {
        Self {
            setter: true,
            skip_mark_modified: false,
        }
    }
}

/// Options for [`Entity::to_object`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ToObjectOptions {
    /// Apply each field's transform (or the Date to ISO-8601 rule) instead of
    /// returning raw stored values.
    pub transform: bool,
}

/// One resource instance.
#[derive(Clone)]
pub struct Entity {
    model: Model,
    type_name: String,
    id: Option<String>,
    fields: BTreeMap<String, Value>,
    modified: Vec<String>,
    is_new: bool,
}

impl Entity {
    pub(crate) fn construct(model: Model, obj: Value, is_new: bool) -> Self {
        let mut entity = Self {
            type_name: model.type_name().to_owned(),
            model,
            id: None,
            fields: BTreeMap::new(),
            modified: Vec::new(),
            is_new,
        };
        entity.apply_defaults();

        if let Value::Object(map) = obj {
            for (key, value) in map {
                match key.as_str() {
                    "type" => {
                        if let Value::String(type_name) = value {
                            entity.type_name = type_name;
                        }
                    }
                    "id" => entity.id = id_from_value(value),
                    _ => {
                        entity.set_with(&key, value, SetOptions::silent());
                    }
                }
            }
        }
        entity
    }

    /// Persisted entity carrying only its identity: no defaults, no fields.
    pub(crate) fn stub(model: Model, id: &str) -> Self {
        Self {
            type_name: model.type_name().to_owned(),
            model,
            id: Some(id.to_owned()),
            fields: BTreeMap::new(),
            modified: Vec::new(),
            is_new: false,
        }
    }

    fn apply_defaults(&mut self) {
        let model = self.model.clone();
        let schema = model.schema();
        let attributes = schema
            .attributes()
            .filter_map(|(name, a)| a.default_def().map(|d| (name, d)));
        let relationships = schema
            .relationships()
            .filter_map(|(name, r)| r.default_def().map(|d| (name, d)));
        for (name, default) in attributes.chain(relationships) {
            self.set_with(name, default.resolve(), SetOptions::silent());
        }
    }

    #[must_use]
    pub fn model(&self) -> &Model {
        &self.model
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        self.model.schema()
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: impl Into<String>) -> &mut Self {
        self.id = Some(id.into());
        self
    }

    /// `true` until the first successful save, unless constructed as persisted.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn set_new(&mut self, is_new: bool) -> &mut Self {
        self.is_new = is_new;
        self
    }

    /// Field value with the getter applied. `None` when the field is unset.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<Value> {
        self.get_with(field, GetOptions::default())
    }

    #[must_use]
    pub fn get_with(&self, field: &str, options: GetOptions) -> Option<Value> {
        let value = self.fields.get(field)?.clone();
        if options.getter
            && let Some(getter) = self.schema().field(field).and_then(FieldDef::get_fn)
        {
            return Some(getter(value));
        }
        Some(value)
    }

    /// Stored value without the getter, borrowed.
    #[must_use]
    pub fn get_raw(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Set a field and mark it modified.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.set_with(field, value, SetOptions::default())
    }

    /// Set a field.
    ///
    /// With `setter` enabled, Date-kind attributes are coerced, plain objects
    /// naming a registered type are promoted to entities for relationships,
    /// and the field's setter runs last.
    pub fn set_with(&mut self, field: &str, value: impl Into<Value>, options: SetOptions) -> &mut Self {
        let mut value = value.into();
        if options.setter {
            value = prepare(&self.model, field, value);
        }
        self.fields.insert(field.to_owned(), value);
        if !options.skip_mark_modified {
            self.mark_modified(field);
        }
        self
    }

    /// Set every member of `obj` whose value differs from the current one.
    ///
    /// `type` and `id` replace the entity's identity instead of going through
    /// the field path. Unchanged members are skipped so they are not marked
    /// modified. Non-object input is ignored.
    pub fn assign(&mut self, obj: impl Into<Value>) -> &mut Self {
        let Value::Object(map) = obj.into() else {
            return self;
        };
        for (key, value) in map {
            match key.as_str() {
                "type" => {
                    if let Value::String(type_name) = value
                        && type_name != self.type_name
                    {
                        self.type_name = type_name;
                    }
                }
                "id" => {
                    let id = id_from_value(value);
                    if id != self.id {
                        self.id = id;
                    }
                }
                _ => {
                    if self.get(&key).as_ref() != Some(&value) {
                        self.set(&key, value);
                    }
                }
            }
        }
        self
    }

    pub fn mark_modified(&mut self, field: &str) {
        if !self.is_modified(field) {
            self.modified.push(field.to_owned());
        }
    }

    pub fn unmark_modified(&mut self, field: &str) {
        self.modified.retain(|f| f != field);
    }

    #[must_use]
    pub fn is_modified(&self, field: &str) -> bool {
        self.modified.iter().any(|f| f == field)
    }

    /// `true` when any field is modified.
    #[must_use]
    pub fn is_any_modified(&self) -> bool {
        !self.modified.is_empty()
    }

    /// Modified field names, in the order they were first marked.
    #[must_use]
    pub fn modified_paths(&self) -> &[String] {
        &self.modified
    }

    /// A duplicate with the same id, field values, modified set and `is_new` flag.
    #[must_use]
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// [`Entity::copy`] followed by [`Entity::assign`] on the duplicate.
    #[must_use]
    pub fn copy_with(&self, obj: impl Into<Value>) -> Self {
        let mut copy = self.copy();
        copy.assign(obj);
        copy
    }

    /// The resource identifier `{type, id}`.
    #[must_use]
    pub fn identifier(&self) -> Identifier {
        Identifier {
            type_name: self.type_name.clone(),
            id: self.id.clone(),
        }
    }

    /// Plain snapshot of `type`, `id` and every declared field that is set.
    ///
    /// Related entities recurse into their own snapshot.
    #[must_use]
    pub fn to_object(&self, options: ToObjectOptions) -> Value {
        let mut obj = BTreeMap::new();
        obj.insert("type".to_owned(), Value::String(self.type_name.clone()));
        if let Some(id) = &self.id {
            obj.insert("id".to_owned(), Value::String(id.clone()));
        }

        let schema = self.schema();
        for (name, attribute) in schema.attributes() {
            let Some(mut value) = self.get(name) else {
                continue;
            };
            if options.transform {
                value = attribute.serialize_value(value);
            }
            obj.insert(name.to_owned(), snapshot(value, options));
        }
        for (name, relationship) in schema.relationships() {
            let Some(mut value) = self.get(name) else {
                continue;
            };
            if options.transform {
                value = relationship.serialize_value(value);
            }
            obj.insert(name.to_owned(), snapshot(value, options));
        }
        Value::Object(obj)
    }

    /// JSON form: the transformed snapshot rendered as `serde_json::Value`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        self.to_object(ToObjectOptions { transform: true }).to_json()
    }

    /// The request document for this entity: every declared field when new,
    /// only modified fields otherwise.
    #[must_use]
    pub fn to_document(&self) -> Document {
        Document::single(codec::encode(self))
    }

    /// Create (`POST /{type}`) or update (`PATCH /{type}/{id}`) this entity.
    ///
    /// On success the response is decoded and its id and field values are
    /// copied onto `self`; `is_new` and the modified set are then cleared.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingId`] when updating an entity without id
    /// - [`Error::Transport`] when the request fails
    /// - decode errors for the response body
    pub async fn save<T: Transport + ?Sized>(&mut self, transport: &T) -> Result<(), Error> {
        let (method, path) = if self.is_new {
            (http::Method::POST, resource_path([self.type_name.as_str()]))
        } else {
            let id = self.require_id()?;
            (http::Method::PATCH, resource_path([self.type_name.as_str(), id]))
        };

        tracing::debug!(
            type_name = %self.type_name,
            id = ?self.id,
            %method,
            modified = ?self.modified,
            "saving entity"
        );
        let request = TransportRequest::new(method, path).with_body(self.to_document());
        let body = transport.send(request).await?;
        let document = Document::from_value(body)?;

        let returned = returned_fields(self.schema(), &document);
        if let Some(saved) = self.model.decode(&document)?.into_one() {
            self.absorb(saved, &returned);
        }
        self.is_new = false;
        self.modified.clear();
        Ok(())
    }

    /// Delete this entity: `DELETE /{type}/{id}`. Local state is left as is.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingId`] when the entity has no id
    /// - [`Error::Transport`] when the request fails
    pub async fn delete<T: Transport + ?Sized>(&self, transport: &T) -> Result<(), Error> {
        let id = self.require_id()?;
        tracing::debug!(type_name = %self.type_name, id = %id, "deleting entity");
        let path = resource_path([self.type_name.as_str(), id]);
        transport
            .send(TransportRequest::new(http::Method::DELETE, path))
            .await?;
        Ok(())
    }

    fn require_id(&self) -> Result<&str, Error> {
        self.id.as_deref().ok_or_else(|| Error::MissingId {
            type_name: self.type_name.clone(),
        })
    }

    /// Copy identity and the `returned` fields of a saved response onto `self`.
    fn absorb(&mut self, mut saved: Entity, returned: &[String]) {
        self.type_name = saved.type_name;
        if saved.id.is_some() {
            self.id = saved.id;
        }
        for field in returned {
            if let Some(value) = saved.fields.remove(field) {
                self.fields.insert(field.clone(), value);
            }
        }
    }
}

/// Field names present on the wire in a response's primary resource.
///
/// Fields the server left out keep their local values on save.
fn returned_fields(schema: &Schema, document: &Document) -> Vec<String> {
    let resource = match &document.data {
        Some(PrimaryData::One(resource)) => &**resource,
        Some(PrimaryData::Many(resources)) => match resources.first() {
            Some(resource) => resource,
            None => return Vec::new(),
        },
        None => return Vec::new(),
    };

    let attributes = resource.attributes.keys().map(|wire| {
        schema
            .attribute_by_wire(wire)
            .map_or(wire.as_str(), |(name, _)| name)
    });
    let relationships = resource
        .relationships
        .iter()
        .filter(|(_, object)| object.data.is_some())
        .map(|(wire, _)| {
            schema
                .relationship_by_wire(wire)
                .map_or(wire.as_str(), |(name, _)| name)
        });
    attributes.chain(relationships).map(str::to_owned).collect()
}

/// Coercion, relationship promotion and setter for an incoming value.
fn prepare(model: &Model, field: &str, value: Value) -> Value {
    match model.schema().field(field) {
        Some(FieldDef::Attribute(attribute)) => {
            let value = match attribute.kind() {
                AttributeKind::Date => value.coerce_date(),
                AttributeKind::Any => value,
            };
            match attribute.set_fn() {
                Some(setter) => setter(value),
                None => value,
            }
        }
        Some(FieldDef::Relationship(relationship)) => {
            let value = model.registry().hydrate(value);
            match relationship.set_fn() {
                Some(setter) => setter(value),
                None => value,
            }
        }
        None => value,
    }
}

fn snapshot(value: Value, options: ToObjectOptions) -> Value {
    match value {
        Value::Entity(e) => e.to_object(options),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| match item {
                    Value::Entity(e) => e.to_object(options),
                    other => other,
                })
                .collect(),
        ),
        other => other,
    }
}

pub(crate) fn id_from_value(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name
            && self.id == other.id
            && self.is_new == other.is_new
            && self.fields == other.fields
            && self.modified == other.modified
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("type_name", &self.type_name)
            .field("id", &self.id)
            .field("is_new", &self.is_new)
            .field("fields", &self.fields)
            .field("modified", &self.modified)
            .finish_non_exhaustive()
    }
}

impl Serialize for Entity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::registry::TypeRegistry;
    use crate::schema::{Attribute, Relationship};
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::sync::Arc;

    fn registry() -> Arc<TypeRegistry> {
        TypeRegistry::builder()
            .register(
                "articles",
                Schema::new()
                    .attribute("title", Attribute::new())
                    .attribute("status", Attribute::new().default_value("draft"))
                    .attribute("createdAt", Attribute::new().wire_name("created-at").date())
                    .attribute(
                        "slug",
                        Attribute::new()
                            .setter(|v| match v {
                                Value::String(s) => Value::String(s.to_lowercase()),
                                other => other,
                            })
                            .getter(|v| match v {
                                Value::String(s) => Value::String(format!("/{s}")),
                                other => other,
                            }),
                    )
                    .relationship("author", Relationship::to("people"))
                    .relationship("comments", Relationship::to("comments")),
            )
            .register(
                "people",
                Schema::new().attribute("name", Attribute::new().wire_name("first-name")),
            )
            .register("comments", Schema::new().attribute("body", Attribute::new()))
            .build()
    }

    fn articles() -> Model {
        registry().model("articles").unwrap()
    }

    #[test]
    fn test_fresh_entity_is_not_modified_until_set() {
        let mut article = articles().create();
        assert!(article.is_new());
        assert!(!article.is_any_modified());

        article.set("title", "Hello");
        assert!(article.is_any_modified());
        assert!(article.is_modified("title"));
        assert!(!article.is_modified("status"));
    }

    #[test]
    fn test_defaults_are_applied_without_marking() {
        let article = articles().create();
        assert_eq!(article.get("status"), Some(Value::from("draft")));
        assert!(!article.is_any_modified());
    }

    #[test]
    fn test_unset_field_reads_as_none() {
        let article = articles().create();
        assert_eq!(article.get("title"), None);
        assert_eq!(article.get("nope"), None);
    }

    #[test]
    fn test_getter_and_setter() {
        let mut article = articles().create();
        article.set("slug", "Hello-World");

        assert_eq!(article.get_raw("slug"), Some(&Value::from("hello-world")));
        assert_eq!(article.get("slug"), Some(Value::from("/hello-world")));
        assert_eq!(
            article.get_with("slug", GetOptions { getter: false }),
            Some(Value::from("hello-world"))
        );

        article.set_with(
            "slug",
            "RAW",
            SetOptions {
                setter: false,
                skip_mark_modified: false,
            },
        );
        assert_eq!(article.get_raw("slug"), Some(&Value::from("RAW")));
    }

    #[test]
    fn test_date_attribute_is_coerced_on_set() {
        let mut article = articles().create();
        article.set("createdAt", "2024-05-01T00:00:00Z");
        assert_eq!(
            article.get("createdAt").and_then(|v| v.as_date()),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_relationship_object_is_promoted() {
        let mut article = articles().create();
        article.set("author", json!({"type": "people", "id": "9", "name": "Dan"}));

        let author = article.get("author").unwrap();
        let author = author.as_entity().unwrap();
        assert_eq!(author.type_name(), "people");
        assert_eq!(author.id(), Some("9"));
        assert!(author.is_new());
        assert!(!author.is_any_modified());

        article.set(
            "comments",
            json!([{"type": "comments", "id": "1"}, {"type": "comments", "id": "2"}]),
        );
        let comments = article.get("comments").unwrap();
        let ids: Vec<_> = comments.entities().filter_map(Entity::id).collect();
        assert_eq!(ids, ["1", "2"]);
    }

    #[test]
    fn test_build_sets_identity_and_fields_without_marking() {
        let article = articles().build(json!({"type": "articles", "id": "1", "title": "T"}));
        assert_eq!(article.id(), Some("1"));
        assert_eq!(article.get("title"), Some(Value::from("T")));
        assert!(article.is_new());
        assert!(!article.is_any_modified());
    }

    #[test]
    fn test_assign_only_marks_changed_fields() {
        let mut article = articles().build_persisted(json!({"id": "1", "title": "Same"}));

        article.assign(json!({"id": "1", "title": "Same", "status": "published"}));
        assert_eq!(article.modified_paths(), ["status"]);

        article.assign(json!({"id": "2"}));
        assert_eq!(article.id(), Some("2"));
        assert_eq!(article.modified_paths(), ["status"]);
    }

    #[test]
    fn test_mark_and_unmark() {
        let mut article = articles().create();
        article.mark_modified("title");
        article.mark_modified("title");
        assert_eq!(article.modified_paths(), ["title"]);

        article.unmark_modified("title");
        assert!(!article.is_any_modified());
    }

    #[test]
    fn test_copy_duplicates_state_and_applies_assign() {
        let mut article = articles().build_persisted(json!({"id": "1", "title": "A"}));
        article.set("status", "published");

        let copy = article.copy();
        assert_eq!(copy, article);

        let changed = article.copy_with(json!({"title": "B"}));
        assert_eq!(changed.id(), Some("1"));
        assert!(!changed.is_new());
        assert_eq!(changed.modified_paths(), ["status", "title"]);
        assert_eq!(article.get("title"), Some(Value::from("A")));
    }

    #[test]
    fn test_to_object_recurses_and_transforms() {
        let mut article = articles().build(json!({"id": "1", "title": "A"}));
        article.set("createdAt", "2024-05-01T00:00:00Z");
        article.set("author", json!({"type": "people", "id": "9", "name": "Dan"}));

        let raw = article.to_object(ToObjectOptions::default());
        let raw = raw.as_object().unwrap();
        assert!(matches!(raw["createdAt"], Value::Date(_)));
        let author = raw["author"].as_object().unwrap();
        assert_eq!(author["id"], Value::from("9"));
        assert_eq!(author["name"], Value::from("Dan"));

        assert_eq!(
            article.to_json(),
            json!({
                "type": "articles",
                "id": "1",
                "title": "A",
                "status": "draft",
                "createdAt": "2024-05-01T00:00:00.000Z",
                "author": {"type": "people", "id": "9", "name": "Dan"}
            })
        );
    }

    #[test]
    fn test_serialize_uses_to_json() {
        let article = articles().build(json!({"id": "3", "title": "A"}));
        let json = serde_json::to_value(&article).unwrap();
        assert_eq!(json, article.to_json());
    }

    #[test]
    fn test_identifier() {
        let article = articles().build(json!({"id": "3"}));
        let identifier = article.identifier();
        assert_eq!(identifier.type_name, "articles");
        assert_eq!(identifier.id.as_deref(), Some("3"));
    }
}

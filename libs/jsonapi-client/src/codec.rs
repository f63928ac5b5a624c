//! Conversion between JSON:API documents and entities.
//!
//! [`encode`] turns an entity into a resource object, keeping only modified
//! fields for persisted entities. [`decode`] rebuilds entities from a document,
//! resolving relationship linkage against the document's `included` pool and
//! the [`TypeRegistry`].

use crate::document::{Document, Identifier, PrimaryData, RelationshipData, RelationshipObject, Resource};
use crate::entity::{Entity, SetOptions, id_from_value};
use crate::error::Error;
use crate::model::Model;
use crate::registry::TypeRegistry;
use crate::value::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// What decode does with a relationship identifier that has no matching
/// resource in `included`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MissingIncluded {
    /// Fail the whole decode with [`Error::MissingIncludedResource`].
    #[default]
    Fail,
    /// Leave a to-one relationship unset and drop the element from a to-many list.
    Omit,
}

/// Decode policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    pub missing_included: MissingIncluded,
}

impl DecodeOptions {
    #[must_use]
    pub fn missing_included(mut self, policy: MissingIncluded) -> Self {
        self.missing_included = policy;
        self
    }
}

/// Decoded primary data.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Decoded {
    /// The document had no primary data, or `data: null`.
    #[default]
    None,
    One(Entity),
    Many(Vec<Entity>),
}

impl Decoded {
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Decoded::None)
    }

    /// The single decoded entity; for a list, its first element.
    #[must_use]
    pub fn into_one(self) -> Option<Entity> {
        match self {
            Decoded::None => None,
            Decoded::One(entity) => Some(entity),
            Decoded::Many(entities) => entities.into_iter().next(),
        }
    }

    /// All decoded entities; a single entity becomes a one-element list.
    #[must_use]
    pub fn into_many(self) -> Vec<Entity> {
        match self {
            Decoded::None => Vec::new(),
            Decoded::One(entity) => vec![entity],
            Decoded::Many(entities) => entities,
        }
    }
}

/// Encode an entity as a resource object.
///
/// A new entity encodes every declared field that is set; a persisted one
/// encodes only its modified fields. Attribute values go through the field's
/// transform, or the Date to ISO-8601 rule. Relationships are reduced to
/// identifiers, `data: null` when unset.
#[must_use]
pub fn encode(entity: &Entity) -> Resource {
    let schema = entity.schema();
    let selected = |field: &str| entity.is_new() || entity.is_modified(field);

    let mut attributes = serde_json::Map::new();
    for (name, attribute) in schema.attributes() {
        if !selected(name) {
            continue;
        }
        let Some(value) = entity.get(name) else {
            continue;
        };
        attributes.insert(
            attribute.wire_name_or(name).to_owned(),
            attribute.serialize_value(value).to_json(),
        );
    }

    let mut relationships = BTreeMap::new();
    for (name, relationship) in schema.relationships() {
        if !selected(name) {
            continue;
        }
        relationships.insert(
            relationship.wire_name_or(name).to_owned(),
            RelationshipObject::with_data(linkage(entity.get(name))),
        );
    }

    Resource {
        attributes,
        relationships,
        ..Resource::new(entity.type_name(), entity.id().map(str::to_owned))
    }
}

fn linkage(value: Option<Value>) -> Option<RelationshipData> {
    match value? {
        Value::Array(items) => Some(RelationshipData::Many(
            items.iter().filter_map(identifier_of).collect(),
        )),
        single => identifier_of(&single).map(RelationshipData::One),
    }
}

/// Entities and plain objects carrying a string `type` reduce to identifiers.
fn identifier_of(value: &Value) -> Option<Identifier> {
    match value {
        Value::Entity(related) => Some(related.identifier()),
        Value::Object(map) => match map.get("type") {
            Some(Value::String(type_name)) => Some(Identifier {
                type_name: type_name.clone(),
                id: map.get("id").cloned().and_then(id_from_value),
            }),
            _ => None,
        },
        _ => None,
    }
}

/// Decode a document, choosing each primary resource's type through the registry.
///
/// # Errors
///
/// - [`Error::UnregisteredType`] when a primary, included or related resource
///   type is not registered
/// - [`Error::MissingIncludedResource`] when linkage points at a resource that
///   is not in `included` and the policy is [`MissingIncluded::Fail`]
pub fn decode(
    registry: &Arc<TypeRegistry>,
    document: &Document,
    options: DecodeOptions,
) -> Result<Decoded, Error> {
    Decoder::new(registry, document, options).primary(None)
}

/// Decode a document whose primary data is decoded as `model`'s type.
pub(crate) fn decode_as(
    model: &Model,
    document: &Document,
    options: DecodeOptions,
) -> Result<Decoded, Error> {
    Decoder::new(model.registry(), document, options).primary(Some(model))
}

struct Decoder<'a> {
    registry: &'a Arc<TypeRegistry>,
    document: &'a Document,
    options: DecodeOptions,
    /// `(type, id)` of the resources on the current decode path.
    path: Vec<(&'a str, &'a str)>,
    /// Related resources already decoded, shared on every later reference.
    decoded: HashMap<(&'a str, &'a str), Arc<Entity>>,
}

impl<'a> Decoder<'a> {
    fn new(registry: &'a Arc<TypeRegistry>, document: &'a Document, options: DecodeOptions) -> Self {
        Self {
            registry,
            document,
            options,
            path: Vec::new(),
            decoded: HashMap::new(),
        }
    }

    fn primary(mut self, root: Option<&Model>) -> Result<Decoded, Error> {
        let document = self.document;
        match &document.data {
            None => Ok(Decoded::None),
            Some(PrimaryData::One(resource)) => self.resource(resource, root).map(Decoded::One),
            Some(PrimaryData::Many(resources)) => resources
                .iter()
                .map(|resource| self.resource(resource, root))
                .collect::<Result<Vec<_>, _>>()
                .map(Decoded::Many),
        }
    }

    fn model_for(&self, type_name: &str) -> Result<Model, Error> {
        self.registry
            .model(type_name)
            .ok_or_else(|| Error::UnregisteredType {
                type_name: type_name.to_owned(),
            })
    }

    fn resource(&mut self, resource: &'a Resource, model: Option<&Model>) -> Result<Entity, Error> {
        let model = match model {
            Some(model) => model.clone(),
            None => self.model_for(&resource.type_name)?,
        };
        tracing::trace!(
            type_name = %resource.type_name,
            id = ?resource.id,
            "decoding resource"
        );

        let mut entity = model.build_persisted(Value::Null);
        if let Some(id) = &resource.id {
            entity.set_id(id.clone());
        }

        let key = resource
            .id
            .as_deref()
            .map(|id| (resource.type_name.as_str(), id));
        if let Some(key) = key {
            self.path.push(key);
        }
        let filled = self.fill(&model, &mut entity, resource);
        if key.is_some() {
            self.path.pop();
        }
        filled?;

        Ok(entity)
    }

    fn fill(&mut self, model: &Model, entity: &mut Entity, resource: &'a Resource) -> Result<(), Error> {
        let schema = model.schema();

        for (wire, raw) in &resource.attributes {
            let field = schema
                .attribute_by_wire(wire)
                .map_or(wire.as_str(), |(name, _)| name);
            entity.set_with(field, Value::from(raw.clone()), SetOptions::silent());
        }

        for (wire, object) in &resource.relationships {
            let field = schema
                .relationship_by_wire(wire)
                .map_or(wire.as_str(), |(name, _)| name);
            // Relationship objects with only links or meta leave the field untouched.
            let Some(data) = &object.data else {
                continue;
            };
            let value = match data {
                None => Value::Null,
                Some(RelationshipData::One(identifier)) => match self.related(identifier)? {
                    Some(related) => Value::from(related),
                    None => continue,
                },
                Some(RelationshipData::Many(identifiers)) => {
                    let mut items = Vec::with_capacity(identifiers.len());
                    for identifier in identifiers {
                        if let Some(related) = self.related(identifier)? {
                            items.push(Value::from(related));
                        }
                    }
                    Value::Array(items)
                }
            };
            entity.set_with(field, value, SetOptions::silent());
        }
        Ok(())
    }

    fn related(&mut self, identifier: &'a Identifier) -> Result<Option<Arc<Entity>>, Error> {
        let model = self.model_for(&identifier.type_name)?;
        let id = identifier.id.as_deref().unwrap_or_default();
        let key = (identifier.type_name.as_str(), id);

        if let Some(done) = self.decoded.get(&key) {
            return Ok(Some(Arc::clone(done)));
        }
        if self.path.contains(&key) {
            tracing::trace!(type_name = %identifier.type_name, id, "reference cycle, using identity stub");
            return Ok(Some(Arc::new(Entity::stub(model, id))));
        }

        let document = self.document;
        let Some(resource) = document.find_included(&identifier.type_name, id) else {
            return match self.options.missing_included {
                MissingIncluded::Fail => Err(Error::MissingIncludedResource {
                    type_name: identifier.type_name.clone(),
                    id: id.to_owned(),
                }),
                MissingIncluded::Omit => {
                    tracing::trace!(type_name = %identifier.type_name, id, "included resource missing, omitted");
                    Ok(None)
                }
            };
        };

        let entity = Arc::new(self.resource(resource, Some(&model))?);
        self.decoded.insert(key, Arc::clone(&entity));
        Ok(Some(entity))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::schema::{Attribute, Relationship, Schema};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn registry() -> Arc<TypeRegistry> {
        TypeRegistry::builder()
            .register(
                "articles",
                Schema::new()
                    .attribute("title", Attribute::new())
                    .attribute("body", Attribute::new())
                    .attribute("views", Attribute::new())
                    .attribute("createdAt", Attribute::new().wire_name("created-at").date())
                    .relationship("author", Relationship::to("people"))
                    .relationship("comments", Relationship::to("comments")),
            )
            .register(
                "people",
                Schema::new()
                    .attribute("name", Attribute::new())
                    .relationship("favorite", Relationship::to("articles")),
            )
            .register(
                "comments",
                Schema::new()
                    .attribute("text", Attribute::new())
                    .relationship("author", Relationship::to("people")),
            )
            .build()
    }

    fn doc(value: serde_json::Value) -> Document {
        Document::from_value(value).unwrap()
    }

    fn compound() -> Document {
        doc(json!({
            "data": {
                "type": "articles",
                "id": "1",
                "attributes": {"title": "Hello", "created-at": "2024-05-01T10:00:00Z", "extra": 5},
                "relationships": {
                    "author": {"data": {"type": "people", "id": "9"}},
                    "comments": {"data": [{"type": "comments", "id": "5"}, {"type": "comments", "id": "6"}]}
                }
            },
            "included": [
                {"type": "people", "id": "9", "attributes": {"name": "Dan"}},
                {"type": "comments", "id": "5", "attributes": {"text": "first"},
                 "relationships": {"author": {"data": {"type": "people", "id": "9"}}}},
                {"type": "comments", "id": "6", "attributes": {"text": "second"}}
            ]
        }))
    }

    #[test]
    fn test_decode_resolves_compound_document() {
        let article = decode(&registry(), &compound(), DecodeOptions::default())
            .unwrap()
            .into_one()
            .unwrap();

        assert_eq!(article.id(), Some("1"));
        assert!(!article.is_new());
        assert!(!article.is_any_modified());
        assert_eq!(article.get("title"), Some(Value::from("Hello")));
        assert_eq!(
            article.get("createdAt").and_then(|v| v.as_date()),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap())
        );
        assert_eq!(article.get("extra"), Some(Value::from(5_i64)));

        let author = article.get("author").unwrap();
        let author = author.as_entity().unwrap();
        assert_eq!(author.id(), Some("9"));
        assert_eq!(author.get("name"), Some(Value::from("Dan")));
        assert!(!author.is_any_modified());

        let comments = article.get("comments").unwrap();
        let texts: Vec<_> = comments
            .entities()
            .filter_map(|c| c.get("text"))
            .collect();
        assert_eq!(texts, [Value::from("first"), Value::from("second")]);

        let first = comments.entities().next().unwrap();
        let nested = first.get("author").unwrap();
        assert_eq!(nested.as_entity().unwrap().id(), Some("9"));
    }

    #[test]
    fn test_decode_list_shares_included() {
        let document = doc(json!({
            "data": [
                {"type": "articles", "id": "1", "relationships": {"author": {"data": {"type": "people", "id": "9"}}}},
                {"type": "articles", "id": "2", "relationships": {"author": {"data": {"type": "people", "id": "9"}}}}
            ],
            "included": [{"type": "people", "id": "9", "attributes": {"name": "Dan"}}]
        }));

        let articles = decode(&registry(), &document, DecodeOptions::default())
            .unwrap()
            .into_many();
        assert_eq!(articles.len(), 2);
        for article in &articles {
            let author = article.get("author").unwrap();
            assert_eq!(author.as_entity().unwrap().get("name"), Some(Value::from("Dan")));
        }
    }

    #[test]
    fn test_decode_without_data() {
        let decoded = decode(&registry(), &doc(json!({"data": null})), DecodeOptions::default()).unwrap();
        assert!(decoded.is_none());
        assert!(decoded.into_many().is_empty());
    }

    #[test]
    fn test_missing_included_fails_by_default() {
        let document = doc(json!({
            "data": {"type": "articles", "id": "1",
                     "relationships": {"author": {"data": {"type": "people", "id": "404"}}}}
        }));

        let err = decode(&registry(), &document, DecodeOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingIncludedResource { ref type_name, ref id } if type_name == "people" && id == "404"
        ));
    }

    #[test]
    fn test_missing_included_can_be_omitted() {
        let document = doc(json!({
            "data": {"type": "articles", "id": "1",
                     "relationships": {
                         "author": {"data": {"type": "people", "id": "404"}},
                         "comments": {"data": [{"type": "comments", "id": "5"}, {"type": "comments", "id": "404"}]}
                     }},
            "included": [{"type": "comments", "id": "5"}]
        }));

        let options = DecodeOptions::default().missing_included(MissingIncluded::Omit);
        let article = decode(&registry(), &document, options).unwrap().into_one().unwrap();
        assert_eq!(article.get("author"), None);
        assert_eq!(article.get("comments").unwrap().entities().count(), 1);
    }

    #[test]
    fn test_unregistered_type_fails() {
        let document = doc(json!({
            "data": {"type": "articles", "id": "1",
                     "relationships": {"tags": {"data": [{"type": "tags", "id": "1"}]}}},
            "included": [{"type": "tags", "id": "1"}]
        }));
        let err = decode(&registry(), &document, DecodeOptions::default()).unwrap_err();
        assert!(matches!(err, Error::UnregisteredType { ref type_name } if type_name == "tags"));

        let document = doc(json!({"data": {"type": "tags", "id": "1"}}));
        assert!(decode(&registry(), &document, DecodeOptions::default()).is_err());
    }

    #[test]
    fn test_cycles_resolve_to_identity_stub() {
        let document = doc(json!({
            "data": {"type": "articles", "id": "1", "attributes": {"title": "Hello"},
                     "relationships": {"author": {"data": {"type": "people", "id": "9"}}}},
            "included": [
                {"type": "people", "id": "9",
                 "relationships": {"favorite": {"data": {"type": "articles", "id": "1"}}}}
            ]
        }));

        let article = decode(&registry(), &document, DecodeOptions::default())
            .unwrap()
            .into_one()
            .unwrap();
        let author = article.get("author").unwrap();
        let favorite = author.as_entity().unwrap().get("favorite").unwrap();
        let favorite = favorite.as_entity().unwrap();
        assert_eq!(favorite.identifier(), article.identifier());
        assert_eq!(favorite.get("title"), None);
    }

    #[test]
    fn test_cycle_stub_carries_identity_only() {
        let registry = TypeRegistry::builder()
            .register(
                "articles",
                Schema::new()
                    .attribute("status", Attribute::new().default_value("draft"))
                    .relationship("author", Relationship::to("people")),
            )
            .register(
                "people",
                Schema::new().relationship("favorite", Relationship::to("articles")),
            )
            .build();
        let document = doc(json!({
            "data": {"type": "articles", "id": "1",
                     "relationships": {"author": {"data": {"type": "people", "id": "9"}}}},
            "included": [
                {"type": "people", "id": "9",
                 "relationships": {"favorite": {"data": {"type": "articles", "id": "1"}}}}
            ]
        }));

        let article = decode(&registry, &document, DecodeOptions::default())
            .unwrap()
            .into_one()
            .unwrap();
        assert_eq!(article.get("status"), Some(Value::from("draft")));

        let author = article.get("author").unwrap();
        let favorite = author.as_entity().unwrap().get("favorite").unwrap();
        let favorite = favorite.as_entity().unwrap();
        assert_eq!(favorite.id(), Some("1"));
        assert!(!favorite.is_new());
        assert_eq!(favorite.get("status"), None);
    }

    fn cross_linked(n: usize) -> Document {
        let tags: Vec<_> = (1..=n).map(|i| json!({"type": "tags", "id": i.to_string()})).collect();
        let articles: Vec<_> = (1..=n)
            .map(|i| json!({"type": "articles", "id": i.to_string()}))
            .collect();
        let mut included: Vec<_> = (2..=n)
            .map(|i| json!({
                "type": "articles", "id": i.to_string(),
                "relationships": {"tags": {"data": tags.clone()}}
            }))
            .collect();
        included.extend((1..=n).map(|i| json!({
            "type": "tags", "id": i.to_string(), "attributes": {"label": format!("tag {i}")},
            "relationships": {"articles": {"data": articles.clone()}}
        })));
        doc(json!({
            "data": {"type": "articles", "id": "1", "relationships": {"tags": {"data": tags}}},
            "included": included
        }))
    }

    #[test]
    fn test_cross_linked_graph_decodes_each_resource_once() {
        let registry = TypeRegistry::builder()
            .register("articles", Schema::new().relationship("tags", Relationship::to("tags")))
            .register(
                "tags",
                Schema::new()
                    .attribute("label", Attribute::new())
                    .relationship("articles", Relationship::to("articles")),
            )
            .build();

        let n = 12;
        let article = decode(&registry, &cross_linked(n), DecodeOptions::default())
            .unwrap()
            .into_one()
            .unwrap();

        let tags = article.get("tags").unwrap();
        let tags: Vec<_> = tags.entities().collect();
        assert_eq!(tags.len(), n);
        for tag in &tags {
            assert_eq!(tag.get("articles").unwrap().entities().count(), n);
        }

        // tags[0].articles[1] is article 2; its tags[1] is the same tag 2 entity.
        let first_tag_articles = tags[0].get("articles").unwrap();
        let second_article = first_tag_articles.entities().nth(1).unwrap();
        assert_eq!(second_article.id(), Some("2"));
        let nested_tags = second_article.get("tags").unwrap();
        let nested_second = nested_tags.entities().nth(1).unwrap();
        assert!(std::ptr::eq(nested_second, tags[1]));
        assert_eq!(tags[1].get("label"), Some(Value::from("tag 2")));
    }

    #[test]
    fn test_null_linkage_clears_and_links_only_is_ignored() {
        let document = doc(json!({
            "data": {"type": "articles", "id": "1", "relationships": {
                "author": {"data": null},
                "comments": {"links": {"related": "/articles/1/comments"}}
            }}
        }));
        let article = decode(&registry(), &document, DecodeOptions::default())
            .unwrap()
            .into_one()
            .unwrap();
        assert_eq!(article.get("author"), Some(Value::Null));
        assert_eq!(article.get("comments"), None);
    }

    #[test]
    fn test_model_decode_overrides_primary_type() {
        let people = registry().model("people").unwrap();
        let document = doc(json!({"data": {"type": "authors", "id": "3", "attributes": {"name": "Ann"}}}));

        let person = people.decode(&document).unwrap().into_one().unwrap();
        assert_eq!(person.type_name(), "people");
        assert_eq!(person.get("name"), Some(Value::from("Ann")));
    }

    #[test]
    fn test_encode_new_entity_includes_every_set_field() {
        let registry = registry();
        let articles = registry.model("articles").unwrap();
        let mut article = articles.create();
        article.set("title", "Hello");
        article.set("createdAt", "2024-05-01T10:00:00Z");
        article.set("author", json!({"type": "people", "id": "9"}));

        let resource = encode(&article);
        assert_eq!(
            serde_json::to_value(&resource).unwrap(),
            json!({
                "type": "articles",
                "attributes": {"title": "Hello", "created-at": "2024-05-01T10:00:00.000Z"},
                "relationships": {
                    "author": {"data": {"type": "people", "id": "9"}},
                    "comments": {"data": null}
                }
            })
        );
    }

    #[test]
    fn test_encode_persisted_entity_only_modified_fields() {
        let article = decode(&registry(), &compound(), DecodeOptions::default())
            .unwrap()
            .into_one()
            .unwrap();
        let mut article = article;
        article.set("title", "Changed");
        article.set("views", 3);

        let resource = encode(&article);
        let keys: Vec<_> = resource.attributes.keys().cloned().collect();
        assert_eq!(keys, ["title", "views"]);
        assert!(resource.relationships.is_empty());
        assert_eq!(resource.id.as_deref(), Some("1"));
    }

    #[test]
    fn test_encode_to_many_as_identifiers() {
        let article = decode(&registry(), &compound(), DecodeOptions::default())
            .unwrap()
            .into_one()
            .unwrap();
        let mut article = article;
        article.mark_modified("comments");

        let resource = encode(&article);
        assert_eq!(
            serde_json::to_value(&resource.relationships["comments"]).unwrap(),
            json!({"data": [{"type": "comments", "id": "5"}, {"type": "comments", "id": "6"}]})
        );
    }

    #[test]
    fn test_encode_plain_identifier_objects() {
        let articles = registry().model("articles").unwrap();
        let mut article = articles.build_persisted(json!({"id": "1"}));
        article.set_with(
            "author",
            Value::from(json!({"type": "people", "id": 9})),
            SetOptions {
                setter: false,
                skip_mark_modified: false,
            },
        );
        article.set("comments", json!([{"type": "labels", "id": "3"}, "not an identifier"]));

        let resource = encode(&article);
        assert_eq!(
            serde_json::to_value(&resource.relationships).unwrap(),
            json!({
                "author": {"data": {"type": "people", "id": "9"}},
                "comments": {"data": [{"type": "labels", "id": "3"}]}
            })
        );
    }

    #[test]
    fn test_round_trip_reproduces_attributes() {
        let registry = registry();
        let article = decode(&registry, &compound(), DecodeOptions::default())
            .unwrap()
            .into_one()
            .unwrap();

        let mut fresh = article.copy();
        fresh.set_new(true);
        let document = doc(serde_json::to_value(Document::single(encode(&fresh))).unwrap());
        let again = registry
            .model("articles")
            .unwrap()
            .decode_with(&document, DecodeOptions::default().missing_included(MissingIncluded::Omit))
            .unwrap()
            .into_one()
            .unwrap();

        for field in ["title", "createdAt"] {
            assert_eq!(again.get(field), article.get(field), "field {field}");
        }
    }
}

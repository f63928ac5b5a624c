//! Serde model of the JSON:API wire document.
//!
//! Only the subset the client consumes is typed: primary data, `included`,
//! resource objects, relationship linkage and identifiers. `meta` and `links`
//! are kept as raw JSON; every other member is ignored.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// JSON:API version written into request documents.
pub const JSONAPI_VERSION: &str = "1.0";

/// Top-level JSON:API document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonapi: Option<JsonApiObject>,
    /// Primary data. `None` for both an absent member and `data: null`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<PrimaryData>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included: Vec<Resource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<serde_json::Value>,
}

impl Document {
    /// A request document wrapping one resource.
    #[must_use]
    pub fn single(resource: Resource) -> Self {
        Self {
            jsonapi: Some(JsonApiObject::default()),
            data: Some(PrimaryData::One(Box::new(resource))),
            ..Self::default()
        }
    }

    /// Parse a response body. `null` (an empty body) is a document without data.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json::Error` when the body is not a JSON:API document.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value)
    }

    /// The included resource with the given type and id.
    #[must_use]
    pub fn find_included(&self, type_name: &str, id: &str) -> Option<&Resource> {
        self.included
            .iter()
            .find(|r| r.type_name == type_name && r.id.as_deref() == Some(id))
    }
}

/// The `jsonapi` member.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonApiObject {
    pub version: String,
}

impl Default for JsonApiObject {
    fn default() -> Self {
        Self {
            version: JSONAPI_VERSION.to_owned(),
        }
    }
}

/// Primary data: one resource or a list of them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryData {
    Many(Vec<Resource>),
    One(Box<Resource>),
}

/// A resource object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(
        default,
        deserialize_with = "de_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relationships: BTreeMap<String, RelationshipObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

impl Resource {
    #[must_use]
    pub fn new(type_name: impl Into<String>, id: Option<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id,
            ..Self::default()
        }
    }
}

/// A relationship object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipObject {
    /// Resource linkage. `None` when the member is absent, `Some(None)` for
    /// `data: null`.
    #[serde(
        default,
        deserialize_with = "de_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<Option<RelationshipData>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

impl RelationshipObject {
    /// A relationship object carrying `linkage` as its `data` member.
    #[must_use]
    pub fn with_data(linkage: Option<RelationshipData>) -> Self {
        Self {
            data: Some(linkage),
            ..Self::default()
        }
    }
}

/// Resource linkage: to-one or to-many.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationshipData {
    Many(Vec<Identifier>),
    One(Identifier),
}

/// Resource identifier object `{type, id}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(
        default,
        deserialize_with = "de_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
}

/// Distinguishes an explicit `null` from an absent member.
fn de_present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Resource ids are strings, but numeric ids are common enough to accept.
fn de_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        String(String),
        Number(serde_json::Number),
    }

    Ok(Option::<RawId>::deserialize(deserializer)?.map(|raw| match raw {
        RawId::String(s) => s,
        RawId::Number(n) => n.to_string(),
    }))
}

//! Declarative description of one resource type.
//!
//! A [`Schema`] lists the attributes and relationships of a resource type in
//! declaration order. Each field may carry:
//! - a wire name (the member name in the JSON:API document, defaults to the field name)
//! - a default value, applied when an entity is constructed
//! - getter, setter and transform functions
//! - for attributes, a coercion kind ([`AttributeKind::Date`])
//! - for relationships, the related resource type
//!
//! Attributes and relationships are declared explicitly; a field name is
//! unique across both maps.
//!
//! # Example
//!
//! ```rust,ignore
//! let articles = Schema::new()
//!     .attribute("title", Attribute::new())
//!     .attribute("createdAt", Attribute::new().wire_name("created-at").date())
//!     .relationship("author", Relationship::to("people"));
//! ```

use crate::value::{Value, to_iso_string};
use std::fmt;
use std::sync::Arc;

/// Function applied to a field value by a getter, setter or transform.
pub type FieldFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Default value of a field.
#[derive(Clone)]
pub enum DefaultValue {
    Value(Value),
    With(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    #[must_use]
    pub fn resolve(&self) -> Value {
        match self {
            DefaultValue::Value(v) => v.clone(),
            DefaultValue::With(f) => f(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Value(v) => f.debug_tuple("Value").field(v).finish(),
            DefaultValue::With(_) => f.write_str("With(<fn>)"),
        }
    }
}

/// Coercion applied to an attribute value on set and decode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AttributeKind {
    /// Stored as given.
    #[default]
    Any,
    /// Coerced to [`Value::Date`]; rendered as ISO-8601 when encoded.
    Date,
}

/// Options shared by attributes and relationships.
#[derive(Clone, Default)]
struct FieldOptions {
    wire_name: Option<String>,
    default: Option<DefaultValue>,
    get: Option<FieldFn>,
    set: Option<FieldFn>,
    transform: Option<FieldFn>,
}

impl fmt::Debug for FieldOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldOptions")
            .field("wire_name", &self.wire_name)
            .field("default", &self.default)
            .field("get", &self.get.is_some())
            .field("set", &self.set.is_some())
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

macro_rules! field_options_builder {
    () => {
        /// Member name used in the JSON:API document.
        #[must_use]
        pub fn wire_name(mut self, name: impl Into<String>) -> Self {
            self.options.wire_name = Some(name.into());
            self
        }

        /// Fixed default applied at construction.
        #[must_use]
        pub fn default_value(mut self, value: impl Into<Value>) -> Self {
            self.options.default = Some(DefaultValue::Value(value.into()));
            self
        }

        /// Default computed at each construction.
        #[must_use]
        pub fn default_with<F>(mut self, f: F) -> Self
        where
            F: Fn() -> Value + Send + Sync + 'static,
        {
            self.options.default = Some(DefaultValue::With(Arc::new(f)));
            self
        }

        /// Function applied to the stored value on read.
        #[must_use]
        pub fn getter<F>(mut self, f: F) -> Self
        where
            F: Fn(Value) -> Value + Send + Sync + 'static,
        {
            self.options.get = Some(Arc::new(f));
            self
        }

        /// Function applied to the incoming value before it is stored.
        #[must_use]
        pub fn setter<F>(mut self, f: F) -> Self
        where
            F: Fn(Value) -> Value + Send + Sync + 'static,
        {
            self.options.set = Some(Arc::new(f));
            self
        }

        /// Function applied when the value is serialized (encode, `to_json`).
        #[must_use]
        pub fn transform<F>(mut self, f: F) -> Self
        where
            F: Fn(Value) -> Value + Send + Sync + 'static,
        {
            self.options.transform = Some(Arc::new(f));
            self
        }

        #[must_use]
        pub fn wire_name_or<'a>(&'a self, field: &'a str) -> &'a str {
            self.options.wire_name.as_deref().unwrap_or(field)
        }

        #[must_use]
        pub fn default_def(&self) -> Option<&DefaultValue> {
            self.options.default.as_ref()
        }

        #[must_use]
        pub fn get_fn(&self) -> Option<&FieldFn> {
            self.options.get.as_ref()
        }

        #[must_use]
        pub fn set_fn(&self) -> Option<&FieldFn> {
            self.options.set.as_ref()
        }

        #[must_use]
        pub fn transform_fn(&self) -> Option<&FieldFn> {
            self.options.transform.as_ref()
        }
    };
}

/// Definition of one attribute.
#[derive(Clone, Debug, Default)]
pub struct Attribute {
    options: FieldOptions,
    kind: AttributeKind,
}

impl Attribute {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    field_options_builder!();

    /// Coerce values of this attribute to dates.
    #[must_use]
    pub fn date(mut self) -> Self {
        self.kind = AttributeKind::Date;
        self
    }

    #[must_use]
    pub fn kind(&self) -> AttributeKind {
        self.kind
    }

    /// Value as serialized: the transform when one is set, otherwise dates
    /// become ISO-8601 strings for Date-kind attributes.
    #[must_use]
    pub fn serialize_value(&self, value: Value) -> Value {
        if let Some(transform) = &self.options.transform {
            return transform(value);
        }
        match (self.kind, value) {
            (AttributeKind::Date, Value::Date(d)) => Value::String(to_iso_string(&d)),
            (AttributeKind::Date, Value::InvalidDate(_)) => Value::Null,
            (_, value) => value,
        }
    }
}

/// Definition of one relationship.
#[derive(Clone, Debug, Default)]
pub struct Relationship {
    options: FieldOptions,
    related_type: Option<String>,
}

impl Relationship {
    /// A relationship whose related type is not declared.
    ///
    /// Decode still resolves it through the identifier's `type`; query
    /// parameter translation falls back to raw names below it.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A relationship to resources of `related_type`.
    #[must_use]
    pub fn to(related_type: impl Into<String>) -> Self {
        Self {
            related_type: Some(related_type.into()),
            ..Self::default()
        }
    }

    field_options_builder!();

    #[must_use]
    pub fn related_type(&self) -> Option<&str> {
        self.related_type.as_deref()
    }

    /// Value as serialized: the transform when one is set.
    #[must_use]
    pub fn serialize_value(&self, value: Value) -> Value {
        match &self.options.transform {
            Some(transform) => transform(value),
            None => value,
        }
    }
}

/// A declared field of either kind.
#[derive(Clone, Copy, Debug)]
pub enum FieldDef<'a> {
    Attribute(&'a Attribute),
    Relationship(&'a Relationship),
}

impl<'a> FieldDef<'a> {
    #[must_use]
    pub fn wire_name_or(self, field: &'a str) -> &'a str {
        match self {
            FieldDef::Attribute(a) => a.wire_name_or(field),
            FieldDef::Relationship(r) => r.wire_name_or(field),
        }
    }

    #[must_use]
    pub fn get_fn(self) -> Option<&'a FieldFn> {
        match self {
            FieldDef::Attribute(a) => a.get_fn(),
            FieldDef::Relationship(r) => r.get_fn(),
        }
    }
}

/// Attributes and relationships of one resource type, in declaration order.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    attributes: Vec<(String, Attribute)>,
    relationships: Vec<(String, Relationship)>,
}

impl Schema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an attribute, replacing any field of the same name.
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.insert_attribute(name.into(), attribute);
        self
    }

    /// Declare a relationship, replacing any field of the same name.
    #[must_use]
    pub fn relationship(mut self, name: impl Into<String>, relationship: Relationship) -> Self {
        self.insert_relationship(name.into(), relationship);
        self
    }

    /// Merge another schema into this one. Later definitions override
    /// same-named fields; new fields are appended.
    pub fn add(&mut self, other: Schema) -> &mut Self {
        for (name, attribute) in other.attributes {
            self.insert_attribute(name, attribute);
        }
        for (name, relationship) in other.relationships {
            self.insert_relationship(name, relationship);
        }
        self
    }

    fn insert_attribute(&mut self, name: String, attribute: Attribute) {
        self.relationships.retain(|(n, _)| *n != name);
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = attribute,
            None => self.attributes.push((name, attribute)),
        }
    }

    fn insert_relationship(&mut self, name: String, relationship: Relationship) {
        self.attributes.retain(|(n, _)| *n != name);
        match self.relationships.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = relationship,
            None => self.relationships.push((name, relationship)),
        }
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.attributes.iter().map(|(n, a)| (n.as_str(), a))
    }

    pub fn relationships(&self) -> impl Iterator<Item = (&str, &Relationship)> {
        self.relationships.iter().map(|(n, r)| (n.as_str(), r))
    }

    #[must_use]
    pub fn get_attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find_map(|(n, a)| (n == name).then_some(a))
    }

    #[must_use]
    pub fn get_relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships
            .iter()
            .find_map(|(n, r)| (n == name).then_some(r))
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<FieldDef<'_>> {
        self.get_attribute(name)
            .map(FieldDef::Attribute)
            .or_else(|| self.get_relationship(name).map(FieldDef::Relationship))
    }

    /// Wire name of a field; the field name itself when undeclared or unmapped.
    #[must_use]
    pub fn wire_name<'a>(&'a self, field: &'a str) -> &'a str {
        self.field(field).map_or(field, |def| def.wire_name_or(field))
    }

    /// Attribute whose wire name is `wire`, as `(field name, definition)`.
    #[must_use]
    pub fn attribute_by_wire(&self, wire: &str) -> Option<(&str, &Attribute)> {
        self.attributes()
            .find(|(name, a)| a.wire_name_or(name) == wire)
    }

    /// Relationship whose wire name is `wire`, as `(field name, definition)`.
    #[must_use]
    pub fn relationship_by_wire(&self, wire: &str) -> Option<(&str, &Relationship)> {
        self.relationships()
            .find(|(name, r)| r.wire_name_or(name) == wire)
    }
}

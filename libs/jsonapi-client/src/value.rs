//! Dynamic field values stored in an [`Entity`].
//!
//! Attribute values are JSON-shaped, except for Date-kind attributes which are
//! coerced to [`Value::Date`]. Relationship values are [`Value::Entity`] for
//! to-one relationships and a [`Value::Array`] of entities for to-many.

use crate::entity::Entity;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A value held in an entity field.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Date(DateTime<Utc>),
    /// A value that was coerced to a date and failed to parse. Keeps the
    /// unparsed input; renders as JSON `null`.
    InvalidDate(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
    /// A related entity. The handle is shared, not owned: cloning the value
    /// clones the `Arc`.
    Entity(Arc<Entity>),
}

impl Value {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            Value::Entity(e) => Some(e),
            _ => None,
        }
    }

    /// Entities held by a to-many relationship value, skipping non-entity elements.
    ///
    /// A to-one value yields its single entity.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        let items: &[Value] = match self {
            Value::Array(items) => items,
            Value::Entity(_) => std::slice::from_ref(self),
            _ => &[],
        };
        items.iter().filter_map(Value::as_entity)
    }

    /// Render as JSON.
    ///
    /// Dates become ISO-8601 strings with millisecond precision, invalid dates
    /// become `null`, and entities render through [`Entity::to_json`].
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null | Value::InvalidDate(_) => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Date(d) => serde_json::Value::String(to_iso_string(d)),
            Value::Array(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Entity(e) => e.to_json(),
        }
    }

    /// Best-effort coercion to a date.
    ///
    /// Strings parse as RFC 3339, naive ISO-8601 date-times (taken as UTC) or
    /// plain dates; numbers are epoch milliseconds. `Null`, empty strings and
    /// values that already are dates are returned unchanged. Anything else
    /// becomes [`Value::InvalidDate`]; coercion never fails.
    #[must_use]
    pub fn coerce_date(self) -> Value {
        match self {
            Value::Null | Value::Date(_) | Value::InvalidDate(_) => self,
            Value::String(ref s) if s.is_empty() => self,
            Value::String(s) => parse_date(&s).map_or(Value::InvalidDate(s), Value::Date),
            Value::Number(ref n) => n
                .as_i64()
                .and_then(DateTime::from_timestamp_millis)
                .map_or_else(|| Value::InvalidDate(n.to_string()), Value::Date),
            other => Value::InvalidDate(other.to_json().to_string()),
        }
    }
}

/// Format a date the way JSON:API servers usually expect: `2024-01-31T12:00:00.000Z`.
#[must_use]
pub fn to_iso_string(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(d) = DateTime::parse_from_rfc3339(s) {
        return Some(d.with_timezone(&Utc));
    }
    if let Ok(d) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(d.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value.into())
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(value.into())
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Number(value.into())
    }
}

impl From<f64> for Value {
    /// Non-finite floats have no JSON form and become `Null`.
    fn from(value: f64) -> Self {
        serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Date(value)
    }
}

impl From<Entity> for Value {
    fn from(value: Entity) -> Self {
        Value::Entity(Arc::new(value))
    }
}

impl From<Arc<Entity>> for Value {
    fn from(value: Arc<Entity>) -> Self {
        Value::Entity(value)
    }
}

impl From<Vec<Entity>> for Value {
    fn from(value: Vec<Entity>) -> Self {
        Value::Array(value.into_iter().map(Value::from).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

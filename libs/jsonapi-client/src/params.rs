//! Wire query parameters.

use crate::merge::deep_merge;
use serde::{Deserialize, Serialize};

/// Query parameters of one request, as a JSON object.
///
/// Keys are the top-level parameter families (`filter`, `include`, `fields`,
/// `sort`, `page`, plus any caller extras). [`QueryParams::to_pairs`]
/// flattens them into query-string pairs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryParams(serde_json::Map<String, serde_json::Value>);

impl QueryParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) -> Option<serde_json::Value> {
        self.0.insert(key.into(), value)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }

    /// Deep-merge `other` into these params; later scalars win.
    pub fn merge(&mut self, other: QueryParams) {
        for (key, value) in other.0 {
            deep_merge(self.0.entry(key).or_insert(serde_json::Value::Null), value);
        }
    }

    /// Replace top-level keys with those of `other`.
    pub fn override_with(&mut self, other: QueryParams) {
        self.0.extend(other.0);
    }

    #[must_use]
    pub fn into_inner(self) -> serde_json::Map<String, serde_json::Value> {
        self.0
    }

    /// Flatten into `(key, value)` pairs for a query string.
    ///
    /// Nested objects become bracketed keys (`filter[title][eq]`), arrays are
    /// comma-joined, `null` values are skipped.
    ///
    /// ```rust,ignore
    /// // {"filter": {"title": {"eq": "x"}}, "page": {"limit": 10}}
    /// // => [("filter[title][eq]", "x"), ("page[limit]", "10")]
    /// ```
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (key, value) in &self.0 {
            flatten(key.clone(), value, &mut pairs);
        }
        pairs
    }
}

fn flatten(key: String, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
    match value {
        serde_json::Value::Null => {}
        serde_json::Value::Object(map) => {
            for (sub, value) in map {
                flatten(format!("{key}[{sub}]"), value, out);
            }
        }
        serde_json::Value::Array(items) => {
            let joined = items
                .iter()
                .filter_map(scalar)
                .collect::<Vec<_>>()
                .join(",");
            out.push((key, joined));
        }
        scalar_value => {
            if let Some(text) = scalar(scalar_value) {
                out.push((key, text));
            }
        }
    }
}

fn scalar(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for QueryParams {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self(map)
    }
}

/// Non-object values yield empty params.
impl From<serde_json::Value> for QueryParams {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }
}

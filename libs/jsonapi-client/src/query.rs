//! Lazy query builder.
//!
//! A [`Query`] accumulates query intent through chained calls and turns it
//! into wire parameters with [`Query::build_params`]. Nothing is sent until
//! [`Query::execute`] is called or a transport-bound query ([`Query::bind`]) is
//! awaited. Every execution issues a new request; results are never cached.
//!
//! # Example
//!
//! ```rust,ignore
//! let articles = registry.model("articles").expect("registered");
//!
//! let output = articles
//!     .find(Some(Filter::new().with("title", "Hello")))
//!     .include(IncludeTree::new().with("author").nested("comments", IncludeTree::new().with("replies")))
//!     .sort(Sort::new().desc("createdAt").asc("title"))
//!     .limit(10)
//!     .execute(&transport)
//!     .await?;
//! ```

use crate::codec::{self, DecodeOptions, Decoded};
use crate::document::Document;
use crate::entity::Entity;
use crate::error::Error;
use crate::merge::deep_merge;
use crate::model::Model;
use crate::params::QueryParams;
use crate::registry::TypeRegistry;
use crate::schema::{Relationship, Schema};
use crate::transport::{Transport, TransportRequest, resource_path};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::IntoFuture;
use std::sync::Arc;

/// Filter conditions keyed by field name.
///
/// Values are passed through to the wire as given: a direct value or a
/// comparator object such as `{"gte": 10}`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter(serde_json::Map<String, serde_json::Value>);

impl Filter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a condition on `field`.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.0.get(field)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Union with `other`; comparator objects on the same field merge key-wise.
    pub fn merge(&mut self, other: Filter) {
        for (field, value) in other.0 {
            deep_merge(self.0.entry(field).or_insert(serde_json::Value::Null), value);
        }
    }

    /// The filter with declared field names replaced by their wire names.
    #[must_use]
    pub fn to_wire(&self, schema: Option<&Schema>) -> serde_json::Map<String, serde_json::Value> {
        self.0
            .iter()
            .map(|(field, value)| (wire_name(schema, field).to_owned(), value.clone()))
            .collect()
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Filter {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self(map)
    }
}

/// Non-object values yield an empty filter.
impl From<serde_json::Value> for Filter {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }
}

/// One node of an include tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Include {
    /// `true` includes the path, `false` excludes it.
    Flag(bool),
    /// Include paths below this relationship. An empty subtree still
    /// includes the relationship itself.
    Nested(IncludeTree),
}

impl From<bool> for Include {
    fn from(flag: bool) -> Self {
        Include::Flag(flag)
    }
}

impl From<IncludeTree> for Include {
    fn from(tree: IncludeTree) -> Self {
        Include::Nested(tree)
    }
}

/// Relationships to include, keyed by field name, in the order given.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IncludeTree(Vec<(String, Include)>);

impl IncludeTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Include `relationship`.
    #[must_use]
    pub fn with(self, relationship: impl Into<String>) -> Self {
        self.set(relationship, Include::Flag(true))
    }

    /// Exclude `relationship`, overriding an earlier inclusion when merged.
    #[must_use]
    pub fn without(self, relationship: impl Into<String>) -> Self {
        self.set(relationship, Include::Flag(false))
    }

    /// Include paths below `relationship`.
    #[must_use]
    pub fn nested(self, relationship: impl Into<String>, tree: IncludeTree) -> Self {
        self.set(relationship, Include::Nested(tree))
    }

    #[must_use]
    pub fn set(mut self, relationship: impl Into<String>, include: Include) -> Self {
        self.insert(relationship.into(), include);
        self
    }

    fn insert(&mut self, relationship: String, include: Include) {
        match self.0.iter_mut().find(|(name, _)| *name == relationship) {
            Some(slot) => slot.1 = include,
            None => self.0.push((relationship, include)),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Include)> {
        self.0.iter().map(|(name, include)| (name.as_str(), include))
    }

    /// Merge `other` into this tree. Nested trees merge recursively; any
    /// other combination takes `other`'s node. Existing keys keep their position.
    pub fn merge(&mut self, other: IncludeTree) {
        for (relationship, include) in other.0 {
            let existing = self.0.iter_mut().find(|(name, _)| *name == relationship);
            match (existing, include) {
                (Some((_, Include::Nested(current))), Include::Nested(incoming)) => current.merge(incoming),
                (Some(slot), include) => slot.1 = include,
                (None, include) => self.0.push((relationship, include)),
            }
        }
    }

    /// Flatten into dot-joined wire paths.
    ///
    /// Wire names come from each level's relationship definitions; the next
    /// level's schema is the related type's schema in `registry`. Unknown
    /// relationships keep their raw names.
    #[must_use]
    pub fn to_paths(&self, schema: Option<&Schema>, registry: &TypeRegistry) -> Vec<String> {
        let mut paths = Vec::new();
        self.flatten_into(schema, registry, None, &mut paths);
        paths
    }

    fn flatten_into(
        &self,
        schema: Option<&Schema>,
        registry: &TypeRegistry,
        prefix: Option<&str>,
        out: &mut Vec<String>,
    ) {
        for (field, include) in &self.0 {
            let relationship = schema.and_then(|s| s.get_relationship(field));
            let name = relationship.map_or(field.as_str(), |r| r.wire_name_or(field));
            let path = match prefix {
                Some(prefix) => format!("{prefix}.{name}"),
                None => name.to_owned(),
            };
            match include {
                Include::Flag(true) => out.push(path),
                Include::Flag(false) => {}
                Include::Nested(tree) => {
                    let related = relationship
                        .and_then(Relationship::related_type)
                        .and_then(|type_name| registry.schema(type_name));
                    let before = out.len();
                    tree.flatten_into(related, registry, Some(&path), out);
                    if out.len() == before {
                        out.push(path);
                    }
                }
            }
        }
    }
}

impl<K: Into<String>, I: Into<Include>> FromIterator<(K, I)> for IncludeTree {
    fn from_iter<T: IntoIterator<Item = (K, I)>>(iter: T) -> Self {
        let mut tree = Self::new();
        for (relationship, include) in iter {
            tree.insert(relationship.into(), include.into());
        }
        tree
    }
}

/// Parses the wire form, e.g. `"author,comments.replies"`.
impl From<&str> for IncludeTree {
    fn from(paths: &str) -> Self {
        let mut tree = Self::new();
        for path in paths.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let nested = path
                .rsplit('.')
                .fold(None, |below: Option<IncludeTree>, segment| {
                    Some(IncludeTree::new().set(
                        segment,
                        below.map_or(Include::Flag(true), Include::Nested),
                    ))
                });
            if let Some(nested) = nested {
                tree.merge(nested);
            }
        }
        tree
    }
}

/// Builds a tree from `{"author": true, "comments": {"replies": true}}`.
///
/// Booleans become flags and objects become subtrees; any other value is an
/// empty subtree. Object keys are visited in `serde_json` map order.
impl From<serde_json::Value> for IncludeTree {
    fn from(value: serde_json::Value) -> Self {
        let serde_json::Value::Object(map) = value else {
            return Self::default();
        };
        map.into_iter()
            .map(|(relationship, value)| {
                let include = match value {
                    serde_json::Value::Bool(flag) => Include::Flag(flag),
                    other => Include::Nested(IncludeTree::from(other)),
                };
                (relationship, include)
            })
            .collect()
    }
}

/// Sort direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDir {
    #[default]
    #[serde(rename = "asc")]
    Asc,
    #[serde(rename = "desc")]
    Desc,
}

/// Negative numbers sort descending.
impl From<i32> for SortDir {
    fn from(order: i32) -> Self {
        if order < 0 { SortDir::Desc } else { SortDir::Asc }
    }
}

/// `desc` and `descending` sort descending; anything else ascending.
impl From<&str> for SortDir {
    fn from(order: &str) -> Self {
        if order.eq_ignore_ascii_case("desc") || order.eq_ignore_ascii_case("descending") {
            SortDir::Desc
        } else {
            SortDir::Asc
        }
    }
}

/// Sort keys in priority order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sort(Vec<(String, SortDir)>);

impl Sort {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn asc(self, field: impl Into<String>) -> Self {
        self.by(field, SortDir::Asc)
    }

    #[must_use]
    pub fn desc(self, field: impl Into<String>) -> Self {
        self.by(field, SortDir::Desc)
    }

    /// Sort by `field`. Re-sorting by a field keeps its position.
    #[must_use]
    pub fn by(mut self, field: impl Into<String>, dir: impl Into<SortDir>) -> Self {
        self.insert(field.into(), dir.into());
        self
    }

    fn insert(&mut self, field: String, dir: SortDir) {
        match self.0.iter_mut().find(|(name, _)| *name == field) {
            Some(slot) => slot.1 = dir,
            None => self.0.push((field, dir)),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn merge(&mut self, other: Sort) {
        for (field, dir) in other.0 {
            self.insert(field, dir);
        }
    }

    /// Comma-joined wire tokens, `-` marking descending keys.
    #[must_use]
    pub fn to_wire(&self, schema: Option<&Schema>) -> String {
        self.0
            .iter()
            .map(|(field, dir)| {
                let name = wire_name(schema, field);
                match dir {
                    SortDir::Asc => name.to_owned(),
                    SortDir::Desc => format!("-{name}"),
                }
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl<K: Into<String>, D: Into<SortDir>> FromIterator<(K, D)> for Sort {
    fn from_iter<T: IntoIterator<Item = (K, D)>>(iter: T) -> Self {
        iter.into_iter()
            .fold(Self::new(), |sort, (field, dir)| sort.by(field, dir))
    }
}

/// What a query fetches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    /// `GET /{type}`
    Find,
    /// `GET /{type}/{id}`
    FindById,
    /// `GET /{type}/{id}/{relationship}`
    FindRelationship,
}

/// Accumulated query options. `None` means "not set".
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryOptions {
    pub op: Option<Operation>,
    pub id: Option<String>,
    /// Relationship field name for [`Operation::FindRelationship`].
    pub related: Option<String>,
    pub filter: Option<Filter>,
    pub include: Option<IncludeTree>,
    /// Sparse fieldsets: resource type to field names.
    pub fields: Option<BTreeMap<String, Vec<String>>>,
    pub sort: Option<Sort>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub raw: Option<bool>,
    /// Extra parameters, applied last and overriding computed ones.
    pub query_params: Option<QueryParams>,
    pub decode: Option<DecodeOptions>,
}

impl QueryOptions {
    /// Merge `other` into these options.
    ///
    /// Set values in `other` win for scalars. Filters and extra params merge
    /// deeply, include trees and sort keys merge by key, and field lists
    /// replace those of the same type. Unset values keep the current ones.
    pub fn merge(&mut self, other: QueryOptions) {
        merge_option(&mut self.op, other.op, replace);
        merge_option(&mut self.id, other.id, replace);
        merge_option(&mut self.related, other.related, replace);
        merge_option(&mut self.filter, other.filter, Filter::merge);
        merge_option(&mut self.include, other.include, IncludeTree::merge);
        merge_option(&mut self.fields, other.fields, |current, incoming| {
            current.extend(incoming);
        });
        merge_option(&mut self.sort, other.sort, Sort::merge);
        merge_option(&mut self.limit, other.limit, replace);
        merge_option(&mut self.offset, other.offset, replace);
        merge_option(&mut self.raw, other.raw, replace);
        merge_option(&mut self.query_params, other.query_params, QueryParams::merge);
        merge_option(&mut self.decode, other.decode, replace);
    }
}

fn merge_option<T>(current: &mut Option<T>, incoming: Option<T>, merge: impl FnOnce(&mut T, T)) {
    let Some(incoming) = incoming else {
        return;
    };
    match current {
        Some(current) => merge(current, incoming),
        None => *current = Some(incoming),
    }
}

fn replace<T>(current: &mut T, incoming: T) {
    *current = incoming;
}

fn wire_name<'a>(schema: Option<&'a Schema>, field: &'a str) -> &'a str {
    schema.map_or(field, |s| s.wire_name(field))
}

/// Result of [`Query::execute`] with the raw flag set.
#[derive(Clone, Debug, PartialEq)]
pub struct RawResult {
    pub result: Decoded,
    /// The response body exactly as received.
    pub body: serde_json::Value,
}

/// Resolved value of a query.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryOutput {
    Decoded(Decoded),
    Raw(RawResult),
}

impl QueryOutput {
    /// The decoded graph, dropping the raw body if any.
    #[must_use]
    pub fn into_decoded(self) -> Decoded {
        match self {
            QueryOutput::Decoded(decoded) => decoded,
            QueryOutput::Raw(raw) => raw.result,
        }
    }

    #[must_use]
    pub fn into_one(self) -> Option<Entity> {
        self.into_decoded().into_one()
    }

    #[must_use]
    pub fn into_many(self) -> Vec<Entity> {
        self.into_decoded().into_many()
    }

    #[must_use]
    pub fn into_raw(self) -> Option<RawResult> {
        match self {
            QueryOutput::Raw(raw) => Some(raw),
            QueryOutput::Decoded(_) => None,
        }
    }
}

/// Lazily executed query against one resource type.
#[derive(Clone, Debug)]
pub struct Query {
    model: Model,
    options: QueryOptions,
}

impl Query {
    #[must_use]
    pub fn new(model: Model) -> Self {
        Self {
            model,
            options: QueryOptions::default(),
        }
    }

    #[must_use]
    pub fn model(&self) -> &Model {
        &self.model
    }

    #[must_use]
    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Merge `options` into the current options, or replace them when `overwrite`.
    #[must_use]
    pub fn set_options(mut self, options: QueryOptions, overwrite: bool) -> Self {
        if overwrite {
            self.options = options;
        } else {
            self.options.merge(options);
        }
        self
    }

    fn with(self, options: QueryOptions) -> Self {
        self.set_options(options, false)
    }

    /// Collection query. Result: a list.
    #[must_use]
    pub fn find(self, filter: Option<Filter>) -> Self {
        self.with(QueryOptions {
            op: Some(Operation::Find),
            filter,
            ..QueryOptions::default()
        })
    }

    /// Single-resource query. Result: one entity or none.
    #[must_use]
    pub fn find_by_id(self, id: impl Into<String>, filter: Option<Filter>) -> Self {
        self.with(QueryOptions {
            op: Some(Operation::FindById),
            id: Some(id.into()),
            filter,
            ..QueryOptions::default()
        })
    }

    /// Related-resource query on the resource selected by [`Query::find_by_id`].
    ///
    /// The filter applies to the related type; the result is decoded through
    /// the registry since the related type may differ from this one.
    #[must_use]
    pub fn get(self, relationship: impl Into<String>, filter: Option<Filter>) -> Self {
        self.with(QueryOptions {
            op: Some(Operation::FindRelationship),
            related: Some(relationship.into()),
            filter,
            ..QueryOptions::default()
        })
    }

    #[must_use]
    pub fn filter(self, filter: impl Into<Filter>) -> Self {
        self.with(QueryOptions {
            filter: Some(filter.into()),
            ..QueryOptions::default()
        })
    }

    #[must_use]
    pub fn include(self, include: impl Into<IncludeTree>) -> Self {
        self.with(QueryOptions {
            include: Some(include.into()),
            ..QueryOptions::default()
        })
    }

    /// Sparse fieldset for `type_name`.
    #[must_use]
    pub fn fields<I, S>(self, type_name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields = BTreeMap::from([(
            type_name.into(),
            fields.into_iter().map(Into::into).collect(),
        )]);
        self.with(QueryOptions {
            fields: Some(fields),
            ..QueryOptions::default()
        })
    }

    #[must_use]
    pub fn sort(self, sort: impl Into<Sort>) -> Self {
        self.with(QueryOptions {
            sort: Some(sort.into()),
            ..QueryOptions::default()
        })
    }

    #[must_use]
    pub fn limit(self, limit: u64) -> Self {
        self.with(QueryOptions {
            limit: Some(limit),
            ..QueryOptions::default()
        })
    }

    #[must_use]
    pub fn offset(self, offset: u64) -> Self {
        self.with(QueryOptions {
            offset: Some(offset),
            ..QueryOptions::default()
        })
    }

    /// Extra wire parameters, merged last.
    #[must_use]
    pub fn query_params(self, params: impl Into<QueryParams>) -> Self {
        self.with(QueryOptions {
            query_params: Some(params.into()),
            ..QueryOptions::default()
        })
    }

    /// Resolve to [`QueryOutput::Raw`], exposing the response body.
    #[must_use]
    pub fn raw(self) -> Self {
        self.with(QueryOptions {
            raw: Some(true),
            ..QueryOptions::default()
        })
    }

    #[must_use]
    pub fn decode_options(self, options: DecodeOptions) -> Self {
        self.with(QueryOptions {
            decode: Some(options),
            ..QueryOptions::default()
        })
    }

    /// Schema used to translate filter, include and sort names: the related
    /// type's schema for relationship queries, this type's otherwise.
    fn target_schema(&self) -> Option<&Schema> {
        if self.options.op == Some(Operation::FindRelationship)
            && let Some(related) = &self.options.related
        {
            return self
                .model
                .schema()
                .get_relationship(related)
                .and_then(Relationship::related_type)
                .and_then(|type_name| self.model.registry().schema(type_name));
        }
        Some(self.model.schema())
    }

    /// Wire query parameters for the current options.
    #[must_use]
    pub fn build_params(&self) -> QueryParams {
        let registry = self.model.registry();
        let schema = self.target_schema();
        let mut params = QueryParams::new();

        if let Some(filter) = &self.options.filter {
            params.insert("filter", serde_json::Value::Object(filter.to_wire(schema)));
        }

        if let Some(include) = &self.options.include {
            let paths = include.to_paths(schema, registry);
            if !paths.is_empty() {
                params.insert("include", paths.join(",").into());
            }
        }

        if let Some(fields) = &self.options.fields {
            let fields = fields
                .iter()
                .map(|(type_name, list)| {
                    let type_schema = registry.schema(type_name);
                    let names = list
                        .iter()
                        .map(|field| wire_name(type_schema, field))
                        .collect::<Vec<_>>()
                        .join(",");
                    (type_name.clone(), serde_json::Value::String(names))
                })
                .collect();
            params.insert("fields", serde_json::Value::Object(fields));
        }

        if let Some(sort) = &self.options.sort
            && !sort.is_empty()
        {
            params.insert("sort", sort.to_wire(schema).into());
        }

        if self.options.limit.is_some() || self.options.offset.is_some() {
            let mut page = serde_json::Map::new();
            if let Some(limit) = self.options.limit {
                page.insert("limit".to_owned(), limit.into());
            }
            if let Some(offset) = self.options.offset {
                page.insert("offset".to_owned(), offset.into());
            }
            params.insert("page", serde_json::Value::Object(page));
        }

        if let Some(extra) = &self.options.query_params {
            params.override_with(extra.clone());
        }
        params
    }

    fn path(&self, op: Operation) -> Result<String, Error> {
        let type_name = self.model.type_name();
        let id = || {
            self.options.id.as_deref().ok_or_else(|| Error::MissingId {
                type_name: type_name.to_owned(),
            })
        };
        Ok(match op {
            Operation::Find => resource_path([type_name]),
            Operation::FindById => resource_path([type_name, id()?]),
            Operation::FindRelationship => {
                let related = self.options.related.as_deref().ok_or(Error::NoOperation)?;
                let wire = self.model.schema().wire_name(related);
                resource_path([type_name, id()?, wire])
            }
        })
    }

    /// Issue the request and decode the response.
    ///
    /// Each call sends a new request.
    ///
    /// # Errors
    ///
    /// - [`Error::NoOperation`] when no operation was selected
    /// - [`Error::MissingId`] when a relationship query has no id
    /// - [`Error::Transport`] when the request fails
    /// - [`Error::InvalidDocument`] and decode errors for the response body
    pub async fn execute<T: Transport + ?Sized>(&self, transport: &T) -> Result<QueryOutput, Error> {
        let op = self.options.op.ok_or(Error::NoOperation)?;
        let path = self.path(op)?;
        let params = self.build_params();
        tracing::debug!(
            type_name = %self.model.type_name(),
            ?op,
            %path,
            "executing query"
        );

        let request = TransportRequest::new(http::Method::GET, path).with_params(params);
        let body = transport.send(request).await?;

        let raw = self.options.raw.unwrap_or(false);
        let (document, body) = if raw {
            (Document::from_value(body.clone())?, Some(body))
        } else {
            (Document::from_value(body)?, None)
        };

        let decode = self.options.decode.unwrap_or_default();
        let result = match op {
            Operation::FindRelationship => codec::decode(self.model.registry(), &document, decode)?,
            Operation::Find | Operation::FindById => self.model.decode_with(&document, decode)?,
        };

        Ok(match body {
            Some(body) => QueryOutput::Raw(RawResult { result, body }),
            None => QueryOutput::Decoded(result),
        })
    }

    /// Bind the query to a transport so it can be `.await`ed directly.
    #[must_use]
    pub fn bind<T: Transport + ?Sized + 'static>(self, transport: Arc<T>) -> BoundQuery<T> {
        BoundQuery {
            query: self,
            transport,
        }
    }
}

/// A query bound to its transport.
///
/// Awaiting it executes the query. Awaiting a reference (`(&bound).await`)
/// executes it again without consuming it; every await is a new request.
pub struct BoundQuery<T: ?Sized> {
    query: Query,
    transport: Arc<T>,
}

impl<T: ?Sized> BoundQuery<T> {
    #[must_use]
    pub fn query(&self) -> &Query {
        &self.query
    }
}

impl<T: ?Sized> Clone for BoundQuery<T> {
    fn clone(&self) -> Self {
        Self {
            query: self.query.clone(),
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: ?Sized> std::fmt::Debug for BoundQuery<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundQuery")
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

impl<T: Transport + ?Sized + 'static> IntoFuture for BoundQuery<T> {
    type Output = Result<QueryOutput, Error>;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { self.query.execute(&*self.transport).await })
    }
}

impl<T: Transport + ?Sized + 'static> IntoFuture for &BoundQuery<T> {
    type Output = Result<QueryOutput, Error>;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        self.clone().into_future()
    }
}

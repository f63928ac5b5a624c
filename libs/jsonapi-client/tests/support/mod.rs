//! Shared fixtures: an in-memory transport and a small article/people/comments registry.

#![allow(dead_code)]

use async_trait::async_trait;
use jsonapi_client::{
    Attribute, Relationship, Schema, Transport, TransportError, TransportRequest, TypeRegistry,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Records every request and answers with queued responses (or `null`).
#[derive(Default)]
pub struct RecordingTransport {
    requests: Mutex<Vec<TransportRequest>>,
    responses: Mutex<VecDeque<Result<serde_json::Value, TransportError>>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, body: serde_json::Value) -> &Self {
        self.responses.lock().push_back(Ok(body));
        self
    }

    pub fn fail(&self, error: TransportError) -> &Self {
        self.responses.lock().push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: TransportRequest) -> Result<serde_json::Value, TransportError> {
        self.requests.lock().push(request);
        self.responses
            .lock()
            .pop_front()
            .unwrap_or(Ok(serde_json::Value::Null))
    }
}

pub fn registry() -> Arc<TypeRegistry> {
    TypeRegistry::builder()
        .register(
            "articles",
            Schema::new()
                .attribute("title", Attribute::new())
                .attribute("body", Attribute::new())
                .attribute("status", Attribute::new().default_value("draft"))
                .attribute("createdAt", Attribute::new().wire_name("created-at").date())
                .relationship("author", Relationship::to("people"))
                .relationship("comments", Relationship::to("comments")),
        )
        .register(
            "people",
            Schema::new().attribute("firstName", Attribute::new().wire_name("first-name")),
        )
        .register(
            "comments",
            Schema::new()
                .attribute("text", Attribute::new())
                .relationship("author", Relationship::to("people")),
        )
        .build()
}

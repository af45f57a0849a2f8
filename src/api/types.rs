//! Shared handler state and response bodies.

use std::sync::Arc;

use serde::Serialize;

use crate::pipeline::schema::SchemaRegistry;
use crate::pipeline::MemoOrchestrator;

/// State shared by every handler. Cheap to clone.
#[derive(Clone)]
pub struct ApiContext {
    pub orchestrator: Arc<MemoOrchestrator>,
    pub schemas: Arc<SchemaRegistry>,
}

impl ApiContext {
    pub fn new(orchestrator: MemoOrchestrator) -> Self {
        let schemas = Arc::clone(&orchestrator.context().schemas);
        Self {
            orchestrator: Arc::new(orchestrator),
            schemas,
        }
    }
}

/// Request id assigned by the logging middleware, available to handlers
/// as a request extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// One registered section schema rendered as JSON Schema.
#[derive(Debug, Serialize)]
pub struct SchemaEntry {
    pub name: &'static str,
    pub schema: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct SchemaListResponse {
    pub schemas: Vec<SchemaEntry>,
}

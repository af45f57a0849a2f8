//! Test doubles for the retrieval and generation seams.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Map, Value};

use super::generation::{GenerationClient, GenerationError, SectionPrompt};
use super::retrieval::{
    PassageMetadata, RetrievalClient, RetrievalError, RetrievalFilter, RetrievedPassage,
};
use super::schema::{FieldKind, FieldSpec, SchemaRegistry, SectionSchema};
use super::worker::WorkerContext;
use crate::pipeline_config::PipelineConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedSearch {
    pub query: String,
    pub filter: RetrievalFilter,
    pub k: usize,
}

/// Returns canned passages for every query (tagged with the query's filter)
/// and records each call.
pub struct StubRetriever {
    passages: Vec<String>,
    fail: bool,
    calls: Mutex<Vec<RecordedSearch>>,
}

impl StubRetriever {
    pub fn with_passages(passages: &[&str]) -> Self {
        Self {
            passages: passages.iter().map(|p| p.to_string()).collect(),
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::with_passages(&[])
    }

    pub fn unavailable() -> Self {
        Self {
            fail: true,
            ..Self::empty()
        }
    }

    pub fn calls(&self) -> Vec<RecordedSearch> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl RetrievalClient for StubRetriever {
    fn search(
        &self,
        query: &str,
        filter: &RetrievalFilter,
        k: usize,
    ) -> Result<Vec<RetrievedPassage>, RetrievalError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedSearch {
                query: query.to_string(),
                filter: filter.clone(),
                k,
            });
        }
        if self.fail {
            return Err(RetrievalError::Unavailable("connection refused".to_string()));
        }
        Ok(self
            .passages
            .iter()
            .take(k)
            .enumerate()
            .map(|(i, content)| RetrievedPassage {
                content: content.clone(),
                metadata: PassageMetadata {
                    source: Some(format!("{}_{}.pdf", filter.country(), filter.topic())),
                    topic: Some(filter.topic().to_string()),
                    country: Some(filter.country().to_string()),
                },
                score: 1.0 - i as f32 * 0.1,
                rank: i + 1,
            })
            .collect())
    }
}

enum Scripted {
    Value(Value),
    Fail(GenerationError),
    Panic,
}

/// Returns a minimal conforming value for any schema unless a value,
/// failure or panic is scripted for that schema name.
pub struct StubGenerator {
    scripted: HashMap<&'static str, Scripted>,
    delay: HashMap<&'static str, Duration>,
    calls: Mutex<Vec<(String, SectionPrompt)>>,
}

impl StubGenerator {
    pub fn new() -> Self {
        Self {
            scripted: HashMap::new(),
            delay: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn returning(mut self, schema: &'static str, value: Value) -> Self {
        self.scripted.insert(schema, Scripted::Value(value));
        self
    }

    pub fn failing(mut self, schema: &'static str, error: GenerationError) -> Self {
        self.scripted.insert(schema, Scripted::Fail(error));
        self
    }

    pub fn panicking(mut self, schema: &'static str) -> Self {
        self.scripted.insert(schema, Scripted::Panic);
        self
    }

    pub fn slow(mut self, schema: &'static str, delay: Duration) -> Self {
        self.delay.insert(schema, delay);
        self
    }

    /// Schema names in call order.
    pub fn schemas_called(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|c| c.iter().map(|(s, _)| s.clone()).collect())
            .unwrap_or_default()
    }

    pub fn prompts(&self) -> Vec<SectionPrompt> {
        self.calls
            .lock()
            .map(|c| c.iter().map(|(_, p)| p.clone()).collect())
            .unwrap_or_default()
    }
}

impl GenerationClient for StubGenerator {
    fn generate(
        &self,
        prompt: &SectionPrompt,
        schema: &SectionSchema,
    ) -> Result<Value, GenerationError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((schema.name.to_string(), prompt.clone()));
        }
        if let Some(delay) = self.delay.get(schema.name) {
            std::thread::sleep(*delay);
        }
        match self.scripted.get(schema.name) {
            Some(Scripted::Value(value)) => Ok(value.clone()),
            Some(Scripted::Fail(error)) => Err(error.clone()),
            Some(Scripted::Panic) => panic!("scripted panic for {}", schema.name),
            None => Ok(minimal_value(&schema.fields)),
        }
    }
}

/// Smallest value satisfying every required field.
pub fn minimal_value(fields: &[FieldSpec]) -> Value {
    let mut map = Map::new();
    for field in fields.iter().filter(|f| f.required) {
        map.insert(field.name.to_string(), minimal_kind(&field.kind));
    }
    Value::Object(map)
}

fn minimal_kind(kind: &FieldKind) -> Value {
    match kind {
        FieldKind::Text => Value::String("stub".to_string()),
        FieldKind::Number => Value::from(0),
        FieldKind::Boolean => Value::Bool(false),
        FieldKind::List(_) => Value::Array(Vec::new()),
        FieldKind::Object(fields) => minimal_value(fields),
    }
}

pub fn stub_context(retriever: StubRetriever, generator: StubGenerator) -> WorkerContext {
    shared_context(Arc::new(retriever), Arc::new(generator))
}

/// Context over shared stubs so a test can inspect them afterwards.
pub fn shared_context(
    retriever: Arc<StubRetriever>,
    generator: Arc<StubGenerator>,
) -> WorkerContext {
    WorkerContext {
        retriever,
        generator,
        schemas: Arc::new(SchemaRegistry::new()),
        settings: PipelineConfig::default(),
    }
}

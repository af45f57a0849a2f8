//! Schema-constrained generation.
//!
//! [`GenerationClient`] is the contract workers depend on: a prompt and a
//! schema in, a conforming JSON value (or an explicit failure) out.
//! [`SchemaConstrainedGenerator`] implements it over any [`LlmClient`].

pub mod ollama;

pub use ollama::{MockLlmClient, OllamaClient};

use serde_json::Value;
use thiserror::Error;

use super::sanitize::sanitize_model_output;
use super::schema::{SchemaViolations, SectionSchema};

/// Default number of model calls per section before giving up.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

#[derive(Error, Debug, Clone)]
pub enum GenerationError {
    #[error("Ollama is not running at {0}")]
    Connection(String),

    #[error("Ollama returned error (status {status}): {body}")]
    Service { status: u16, body: String },

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Model output is not valid JSON: {0}")]
    MalformedOutput(String),

    #[error("Output does not match schema `{schema}`: {violations}")]
    SchemaMismatch {
        schema: String,
        violations: SchemaViolations,
    },

    #[error("Generation failed after {attempts} attempt(s): {last}")]
    Exhausted {
        attempts: usize,
        last: Box<GenerationError>,
    },
}

/// Raw text-generation backend.
pub trait LlmClient: Send + Sync {
    /// Generate a completion. `format` is a JSON Schema the backend should
    /// constrain its output to, when it supports that.
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: &str,
        format: Option<&Value>,
    ) -> Result<String, GenerationError>;

    fn is_model_available(&self, model: &str) -> Result<bool, GenerationError>;

    fn list_models(&self) -> Result<Vec<String>, GenerationError>;
}

/// System and user messages for one section.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionPrompt {
    pub system: String,
    pub user: String,
}

/// Returns a value conforming to `schema`, or fails explicitly.
pub trait GenerationClient: Send + Sync {
    fn generate(
        &self,
        prompt: &SectionPrompt,
        schema: &SectionSchema,
    ) -> Result<Value, GenerationError>;
}

pub struct SchemaConstrainedGenerator<C: LlmClient> {
    llm: C,
    model: String,
    max_attempts: usize,
}

impl<C: LlmClient> SchemaConstrainedGenerator<C> {
    pub fn new(llm: C, model: &str) -> Self {
        Self {
            llm,
            model: model.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn llm(&self) -> &C {
        &self.llm
    }
}

impl<C: LlmClient> GenerationClient for SchemaConstrainedGenerator<C> {
    fn generate(
        &self,
        prompt: &SectionPrompt,
        schema: &SectionSchema,
    ) -> Result<Value, GenerationError> {
        let format = schema.to_json_schema();
        let mut user = prompt.user.clone();
        let mut last_error: Option<GenerationError> = None;

        for attempt in 0..self.max_attempts {
            let raw = match self
                .llm
                .generate(&self.model, &user, &prompt.system, Some(&format))
            {
                Ok(raw) => raw,
                Err(e) if is_retryable_error(&e) => {
                    tracing::warn!(
                        schema = schema.name,
                        attempt = attempt + 1,
                        error = %e,
                        "LLM call failed, retrying"
                    );
                    last_error = Some(e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            match parse_and_conform(&raw, schema) {
                Ok(value) => {
                    tracing::debug!(schema = schema.name, attempt = attempt + 1, "Generation conformed");
                    return Ok(value);
                }
                Err(e) => {
                    tracing::warn!(
                        schema = schema.name,
                        attempt = attempt + 1,
                        error = %e,
                        "LLM output rejected, retrying with correction"
                    );
                    user = with_correction(&prompt.user, &e);
                    last_error = Some(e);
                }
            }
        }

        let last = last_error.unwrap_or_else(|| {
            GenerationError::MalformedOutput("no generation attempt was made".to_string())
        });
        Err(GenerationError::Exhausted {
            attempts: self.max_attempts,
            last: Box::new(last),
        })
    }
}

/// Connection failures and 5xx responses are retried; timeouts are not.
fn is_retryable_error(e: &GenerationError) -> bool {
    match e {
        GenerationError::Connection(_) | GenerationError::HttpClient(_) => true,
        GenerationError::Service { status, .. } => *status >= 500,
        _ => false,
    }
}

fn parse_and_conform(raw: &str, schema: &SectionSchema) -> Result<Value, GenerationError> {
    let cleaned = sanitize_model_output(raw);
    let value: Value = serde_json::from_str(&cleaned)
        .map_err(|e| GenerationError::MalformedOutput(e.to_string()))?;
    schema
        .conform(value)
        .map_err(|violations| GenerationError::SchemaMismatch {
            schema: schema.name.to_string(),
            violations,
        })
}

fn with_correction(original: &str, error: &GenerationError) -> String {
    format!(
        "{original}\n\nYour previous answer was rejected: {error}.\n\
         Respond again with a single JSON object that contains every required field \
         with the declared types and nothing else."
    )
}

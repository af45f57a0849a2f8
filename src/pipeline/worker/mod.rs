//! Section workers.
//!
//! One worker per section kind turns the request profile into that section's
//! result: queries and filters, retrieval, context assembly, prompt,
//! schema-constrained generation, validation. Failures never cross the
//! worker boundary; they become error markers in the result.

pub mod legal;
pub mod narrative;
pub mod tax;

pub use legal::LegalWorker;
pub use narrative::NarrativeWorker;
pub use tax::TaxWorker;

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use super::context::assemble_within;
use super::generation::{GenerationClient, GenerationError};
use super::prompt::{build_section_prompt, profile_lines};
use super::retrieval::{RetrievalClient, RetrievalError, RetrievalFilter};
use super::schema::{SchemaId, SchemaRegistry, SchemaViolations};
use super::topics::UnmappedTopic;
use crate::models::{ErrorKind, RequestProfile, SectionKind, SectionResult};
use crate::pipeline_config::PipelineConfig;

#[derive(Error, Debug)]
pub enum SectionError {
    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("{0}")]
    Generation(#[from] GenerationError),

    #[error("Output does not match schema `{schema}`: {violations}")]
    Validation {
        schema: &'static str,
        violations: SchemaViolations,
    },

    #[error(transparent)]
    Unmapped(#[from] UnmappedTopic),

    #[error("A primary jurisdiction is required to retrieve grounded sources")]
    MissingJurisdiction,

    #[error("Section does not apply to this profile")]
    NotApplicable,
}

impl SectionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Retrieval(RetrievalError::InvalidRequest(_)) => ErrorKind::Internal,
            Self::Retrieval(_) => ErrorKind::RetrievalUnavailable,
            Self::Generation(_) | Self::Validation { .. } => ErrorKind::GenerationFailure,
            Self::Unmapped(_) => ErrorKind::UnmappedTopic,
            Self::MissingJurisdiction => ErrorKind::InsufficientProfile,
            Self::NotApplicable => ErrorKind::NotApplicable,
        }
    }

    /// Error marker for `subject` ("Corporate Income Tax", "Risk Assessment").
    pub fn into_result(self, subject: &str) -> SectionResult {
        SectionResult::failed(
            self.kind(),
            format!("Failed to generate {subject} data."),
            self.to_string(),
        )
    }
}

/// Shared collaborators, built once at startup and handed to every worker.
#[derive(Clone)]
pub struct WorkerContext {
    pub retriever: Arc<dyn RetrievalClient>,
    pub generator: Arc<dyn GenerationClient>,
    pub schemas: Arc<SchemaRegistry>,
    pub settings: PipelineConfig,
}

/// Per-call view of the profile once the jurisdiction is known.
pub struct SectionInput<'a> {
    pub profile: &'a RequestProfile,
    pub jurisdiction: &'a str,
    pub profile_lines: Vec<String>,
}

pub trait SectionWorker: Send + Sync {
    /// Which section this worker produces.
    fn section(&self) -> SectionKind;

    fn is_applicable(&self, profile: &RequestProfile) -> bool;

    /// Produce the section. Called only for applicable profiles with a
    /// primary jurisdiction.
    fn produce(&self, input: &SectionInput<'_>, ctx: &WorkerContext) -> SectionResult;
}

/// Run one worker with the checks every section shares.
pub fn run_section(
    worker: &dyn SectionWorker,
    profile: &RequestProfile,
    ctx: &WorkerContext,
) -> SectionResult {
    let section = worker.section();
    if !worker.is_applicable(profile) {
        return SectionError::NotApplicable.into_result(section.title());
    }

    let Some(jurisdiction) = profile.jurisdiction() else {
        tracing::warn!(section = section.as_str(), "No primary jurisdiction, skipping retrieval");
        return SectionError::MissingJurisdiction.into_result(section.title());
    };

    let input = SectionInput {
        profile,
        jurisdiction,
        profile_lines: profile_lines(profile),
    };
    worker.produce(&input, ctx)
}

/// One grounded generation: retrieval for every query, then a single
/// schema-constrained call over the concatenated passages.
pub(crate) struct GroundedRequest<'a> {
    pub subject: &'a str,
    pub queries: Vec<(String, RetrievalFilter)>,
    pub system: &'static str,
    pub task: String,
    pub schema: SchemaId,
    pub profile_lines: &'a [String],
}

pub(crate) fn generate_grounded(
    ctx: &WorkerContext,
    request: &GroundedRequest<'_>,
) -> Result<Value, SectionError> {
    let mut passages = Vec::new();
    for (query, filter) in &request.queries {
        let hits = ctx.retriever.search(query, filter, ctx.settings.top_k)?;
        tracing::debug!(
            subject = request.subject,
            country = filter.country(),
            topic = filter.topic(),
            hits = hits.len(),
            "Retrieved passages"
        );
        passages.extend(hits);
    }

    let context = assemble_within(&passages, ctx.settings.max_context_chars);
    if passages.is_empty() {
        tracing::warn!(
            subject = request.subject,
            "No passages retrieved, generating from profile only"
        );
    } else if context.is_empty() {
        tracing::warn!(
            subject = request.subject,
            retrieved = passages.len(),
            max_chars = ctx.settings.max_context_chars,
            "Context budget too small for any passage, generating from profile only"
        );
    } else {
        tracing::debug!(
            subject = request.subject,
            used = context.passages_used,
            retrieved = passages.len(),
            truncated = context.truncated,
            sources = ?context.sources,
            "Context assembled"
        );
    }

    let schema = ctx.schemas.get(request.schema);
    let prompt = build_section_prompt(
        request.system,
        &request.task,
        &context,
        request.profile_lines,
        schema,
    );
    let value = ctx.generator.generate(&prompt, schema)?;
    schema
        .conform(value)
        .map_err(|violations| SectionError::Validation {
            schema: schema.name,
            violations,
        })
}

/// Append the user's free-text concerns to a retrieval query.
pub(crate) fn with_concerns(mut query: String, profile: &RequestProfile) -> String {
    if let Some(concerns) = profile.specific_concerns() {
        let concerns = super::sanitize::sanitize_user_text(
            concerns,
            super::sanitize::MAX_FREE_TEXT_CHARS,
        );
        if !concerns.is_empty() {
            query.push_str(&format!(" Specific concerns: {concerns}"));
        }
    }
    query
}

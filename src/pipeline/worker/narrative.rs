use crate::models::{ErrorKind, RequestProfile, SectionKind, SectionResult};
use crate::pipeline::prompt::STRATEGY_SYSTEM_PROMPT;
use crate::pipeline::retrieval::RetrievalFilter;
use crate::pipeline::sanitize::{sanitize_user_text, MAX_FIELD_CHARS};
use crate::pipeline::schema::SchemaId;
use crate::pipeline::topics::{CorpusTopic, LegalTopic, TaxTopic};

use super::{generate_grounded, GroundedRequest, SectionInput, SectionWorker, WorkerContext};

/// Fixed recipe for one always-included section.
pub(crate) struct Blueprint {
    pub queries: Vec<(String, CorpusTopic)>,
    pub schema: SchemaId,
    pub task: &'static str,
}

/// Worker for one of the narrative sections.
pub struct NarrativeWorker {
    kind: SectionKind,
}

impl NarrativeWorker {
    /// `None` for the topical sections, which have their own workers.
    pub fn new(kind: SectionKind) -> Option<Self> {
        (!kind.is_topical()).then_some(Self { kind })
    }
}

impl SectionWorker for NarrativeWorker {
    fn section(&self) -> SectionKind {
        self.kind
    }

    fn is_applicable(&self, _profile: &RequestProfile) -> bool {
        true
    }

    fn produce(&self, input: &SectionInput<'_>, ctx: &WorkerContext) -> SectionResult {
        let Some(blueprint) = blueprint(self.kind, input.profile, input.jurisdiction) else {
            return SectionResult::failed(
                ErrorKind::Internal,
                format!("Failed to generate {} data.", self.kind.title()),
                "no narrative blueprint for this section",
            );
        };

        let queries = blueprint
            .queries
            .into_iter()
            .map(|(query, topic)| (query, RetrievalFilter::new(input.jurisdiction, topic.key())))
            .collect();

        let request = GroundedRequest {
            subject: self.kind.title(),
            queries,
            system: STRATEGY_SYSTEM_PROMPT,
            task: blueprint.task.to_string(),
            schema: blueprint.schema,
            profile_lines: &input.profile_lines,
        };

        match generate_grounded(ctx, &request) {
            Ok(value) => SectionResult::Generated(value),
            Err(e) => {
                tracing::warn!(section = self.kind.as_str(), error = %e, "Section generation failed");
                e.into_result(self.kind.title())
            }
        }
    }
}

pub(crate) fn blueprint(
    kind: SectionKind,
    profile: &RequestProfile,
    jurisdiction: &str,
) -> Option<Blueprint> {
    let j = sanitize_user_text(jurisdiction, MAX_FIELD_CHARS);
    let industry = clean_or(profile.industry(), "foreign");
    let size = clean_or(profile.company_size(), "small or medium-sized");

    let blueprint = match kind {
        SectionKind::ExecutiveSummary => Blueprint {
            queries: vec![
                (
                    format!("Market entry overview and key considerations for a {industry} company entering {j}."),
                    CorpusTopic::General,
                ),
                (
                    format!("Corporate income tax overview for foreign-owned companies in {j}."),
                    CorpusTopic::Tax(TaxTopic::CorporateIncomeTax),
                ),
            ],
            schema: SchemaId::ExecutiveSummary,
            task: "the Executive Summary section",
        },
        SectionKind::MarketEntryOptions => {
            let mut entity_query = format!(
                "Market entry options in {j}: subsidiary, branch office and representative office requirements."
            );
            if let Some(option) = profile.entry_option.as_deref() {
                let option = sanitize_user_text(option, MAX_FIELD_CHARS);
                if !option.is_empty() {
                    entity_query.push_str(&format!(" Preferred option: {option}."));
                }
            }
            Blueprint {
                queries: vec![
                    (entity_query, CorpusTopic::Legal(LegalTopic::CorporateLaw)),
                    (
                        format!("Advantages and disadvantages of business structures for foreign companies in {j}."),
                        CorpusTopic::General,
                    ),
                ],
                schema: SchemaId::MarketEntryOptions,
                task: "the Market Entry Options Analysis section",
            }
        }
        SectionKind::ImplementationTimeline => Blueprint {
            queries: vec![
                (
                    format!("Company registration and setup timeline in {j}."),
                    CorpusTopic::Timeline,
                ),
                (
                    format!("Steps and processing times to incorporate a company in {j}."),
                    CorpusTopic::Legal(LegalTopic::CorporateLaw),
                ),
            ],
            schema: SchemaId::ImplementationTimeline,
            task: "the Implementation Timeline section",
        },
        SectionKind::ResourceCosts => Blueprint {
            queries: vec![
                (
                    format!("Company setup costs, notary and registration fees in {j}."),
                    CorpusTopic::Costs,
                ),
                (
                    format!("Annual compliance, accounting and operating costs for a {size} company in {j}."),
                    CorpusTopic::Costs,
                ),
            ],
            schema: SchemaId::ResourceCosts,
            task: "the Resource Requirements & Costs section",
        },
        SectionKind::RiskAssessment => Blueprint {
            queries: vec![
                (
                    format!("Tax, legal and operational risks for foreign companies entering {j}."),
                    CorpusTopic::Risk,
                ),
                (
                    format!("Regulatory compliance risks for {industry} businesses in {j}."),
                    CorpusTopic::General,
                ),
            ],
            schema: SchemaId::RiskAssessment,
            task: "the Risk Assessment section",
        },
        SectionKind::NextSteps => Blueprint {
            queries: vec![(
                format!("Practical first steps to establish a business in {j}."),
                CorpusTopic::Timeline,
            )],
            schema: SchemaId::NextSteps,
            task: "the Next Steps & Action Plan section",
        },
        SectionKind::TaxCompliance | SectionKind::LegalTopics => return None,
    };
    Some(blueprint)
}

fn clean_or(value: Option<&str>, fallback: &str) -> String {
    value
        .map(|v| sanitize_user_text(v, MAX_FIELD_CHARS))
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

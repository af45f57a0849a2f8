use crate::models::{RequestProfile, SectionKind};

/// Sections every memo carries, in document order.
pub const ALWAYS_INCLUDED: [SectionKind; 6] = [
    SectionKind::ExecutiveSummary,
    SectionKind::MarketEntryOptions,
    SectionKind::ImplementationTimeline,
    SectionKind::ResourceCosts,
    SectionKind::RiskAssessment,
    SectionKind::NextSteps,
];

/// Decide which sections the memo for `profile` contains.
///
/// The tax section is planned iff at least one tax topic is selected, the
/// legal section iff at least one legal topic is. Topic labels are not
/// resolved here; an unknown label still plans its section and surfaces as
/// a per-topic marker.
pub fn build_plan(profile: &RequestProfile) -> Vec<SectionKind> {
    let mut plan = ALWAYS_INCLUDED.to_vec();
    if !profile.tax_topics.is_empty() {
        plan.push(SectionKind::TaxCompliance);
    }
    if !profile.legal_topics.is_empty() {
        plan.push(SectionKind::LegalTopics);
    }
    plan
}

use crate::models::{RequestProfile, SectionKind, SectionResult, TopicResults};
use crate::pipeline::prompt::TAX_SYSTEM_PROMPT;
use crate::pipeline::retrieval::RetrievalFilter;
use crate::pipeline::sanitize::{sanitize_user_text, MAX_FIELD_CHARS};
use crate::pipeline::schema::SchemaId;
use crate::pipeline::topics::TaxTopic;

use super::{
    generate_grounded, with_concerns, GroundedRequest, SectionError, SectionInput, SectionWorker,
    WorkerContext,
};

/// Tax & Regulatory Compliance: one entry per selected tax topic.
pub struct TaxWorker;

impl SectionWorker for TaxWorker {
    fn section(&self) -> SectionKind {
        SectionKind::TaxCompliance
    }

    fn is_applicable(&self, profile: &RequestProfile) -> bool {
        !profile.tax_topics.is_empty()
    }

    fn produce(&self, input: &SectionInput<'_>, ctx: &WorkerContext) -> SectionResult {
        let mut topics = TopicResults::new();

        for label in &input.profile.tax_topics {
            let topic = match TaxTopic::resolve(label) {
                Ok(topic) => topic,
                Err(unmapped) => {
                    tracing::warn!(label = %label, "Unmapped tax topic, skipping retrieval");
                    let key = label.trim().to_string();
                    topics.insert(key, SectionError::from(unmapped).into_result(label.trim()));
                    continue;
                }
            };

            if topics.contains(topic.id()) {
                tracing::debug!(topic = topic.id(), "Duplicate tax topic selection ignored");
                continue;
            }

            let result = match produce_topic(topic, input, ctx) {
                Ok(value) => SectionResult::Generated(value),
                Err(e) => {
                    tracing::warn!(topic = topic.id(), error = %e, "Tax topic generation failed");
                    e.into_result(topic.title())
                }
            };
            topics.insert(topic.id(), result);
        }

        SectionResult::Topics(topics)
    }
}

fn produce_topic(
    topic: TaxTopic,
    input: &SectionInput<'_>,
    ctx: &WorkerContext,
) -> Result<serde_json::Value, SectionError> {
    let query = with_concerns(tax_query(topic, input.profile, input.jurisdiction), input.profile);
    let filter = RetrievalFilter::new(input.jurisdiction, topic.key());

    generate_grounded(
        ctx,
        &GroundedRequest {
            subject: topic.title(),
            queries: vec![(query, filter)],
            system: TAX_SYSTEM_PROMPT,
            task: format!("the {} section", topic.title()),
            schema: tax_schema(topic),
            profile_lines: &input.profile_lines,
        },
    )
}

pub(crate) fn tax_schema(topic: TaxTopic) -> SchemaId {
    match topic {
        TaxTopic::CorporateIncomeTax => SchemaId::CorporateIncomeTax,
        TaxTopic::Vat => SchemaId::Vat,
        TaxTopic::WithholdingTax => SchemaId::WithholdingTax,
        TaxTopic::TransferPricing
        | TaxTopic::PermanentEstablishment
        | TaxTopic::SubstanceRequirements
        | TaxTopic::PayrollTax => SchemaId::TaxTopicOverview,
    }
}

/// Retrieval query for a tax topic, before concerns are appended.
pub(crate) fn tax_query(topic: TaxTopic, profile: &RequestProfile, jurisdiction: &str) -> String {
    let jurisdiction = sanitize_user_text(jurisdiction, MAX_FIELD_CHARS);
    match topic {
        TaxTopic::CorporateIncomeTax => format!(
            "Corporate income tax rules for a {} company in {jurisdiction}.",
            clean_or(profile.industry(), "company")
        ),
        TaxTopic::Vat => format!(
            "VAT rules in {jurisdiction} for the following transaction types: {}. Are OSS rules applicable?",
            joined_or(&profile.transaction_types, "general business activities")
        ),
        TaxTopic::WithholdingTax => {
            let mut query = format!(
                "Withholding tax on dividends, interest and royalties paid from {jurisdiction}."
            );
            if !profile.tax_treaties.is_empty() {
                query.push_str(&format!(
                    " Relevant tax treaties: {}.",
                    joined_or(&profile.tax_treaties, "")
                ));
            }
            query
        }
        TaxTopic::TransferPricing => {
            let kinds: Vec<String> = profile
                .relationships
                .iter()
                .map(|r| r.kind.clone())
                .collect();
            format!(
                "Transfer pricing documentation and arm's length requirements in {jurisdiction} for intra-group {}.",
                joined_or(&kinds, "transactions")
            )
        }
        TaxTopic::PermanentEstablishment => format!(
            "Permanent establishment risk in {jurisdiction} for a {} company performing {}.",
            clean_or(profile.industry(), "foreign"),
            joined_or(&profile.activities, "business activities")
        ),
        TaxTopic::SubstanceRequirements => format!(
            "Substance requirements in {jurisdiction} for a {} entity.",
            clean_or(profile.business_structure.as_deref(), "foreign-owned")
        ),
        TaxTopic::PayrollTax => format!(
            "Payroll tax and social security contributions for employers in {jurisdiction}."
        ),
    }
}

fn clean_or(value: Option<&str>, fallback: &str) -> String {
    value
        .map(|v| sanitize_user_text(v, MAX_FIELD_CHARS))
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

fn joined_or(values: &[String], fallback: &str) -> String {
    let cleaned: Vec<String> = values
        .iter()
        .map(|v| sanitize_user_text(v, MAX_FIELD_CHARS))
        .filter(|v| !v.is_empty())
        .collect();
    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ErrorKind;
    use crate::pipeline::generation::GenerationError;
    use crate::pipeline::testing::{shared_context, StubGenerator, StubRetriever};
    use crate::pipeline::worker::run_section;
    use serde_json::json;
    use std::sync::Arc;

    fn profile(topics: &[&str]) -> RequestProfile {
        RequestProfile {
            primary_jurisdiction: Some("Netherlands".into()),
            industry: Some("Software".into()),
            tax_topics: topics.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn cit_topic_issues_one_filtered_query() {
        let retriever = Arc::new(StubRetriever::with_passages(&["CIT is 25.8%."]));
        let cit = json!({"standardRate": "25.8%", "description": "...", "strategies": []});
        let generator = Arc::new(StubGenerator::new().returning("corporate_income_tax", cit.clone()));
        let ctx = shared_context(retriever.clone(), generator.clone());

        let result = run_section(&TaxWorker, &profile(&["corporate-income-tax"]), &ctx);

        let calls = retriever.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].filter.country(), "netherlands");
        assert_eq!(calls[0].filter.topic(), "corporate_income_tax");
        assert_eq!(calls[0].k, 3);
        assert_eq!(
            calls[0].query,
            "Corporate income tax rules for a Software company in Netherlands."
        );

        let topics = result.topics().unwrap();
        assert_eq!(topics.get("corporate-income-tax"), Some(&SectionResult::Generated(cit)));
    }

    #[test]
    fn vat_query_lists_transaction_types_and_concerns() {
        let mut p = profile(&["VAT registration and compliance"]);
        p.transaction_types = vec!["Software licensing".into(), "E-commerce".into()];
        p.specific_concerns = Some("OSS scope".into());
        let query = with_concerns(tax_query(TaxTopic::Vat, &p, "Netherlands"), &p);
        assert_eq!(
            query,
            "VAT rules in Netherlands for the following transaction types: Software licensing, E-commerce. \
             Are OSS rules applicable? Specific concerns: OSS scope"
        );
    }

    #[test]
    fn vat_query_defaults_transaction_types() {
        let query = tax_query(TaxTopic::Vat, &RequestProfile::default(), "Germany");
        assert!(query.contains("general business activities"));
    }

    #[test]
    fn unmapped_label_becomes_marker_without_retrieval() {
        let retriever = Arc::new(StubRetriever::with_passages(&["x"]));
        let generator = Arc::new(StubGenerator::new());
        let ctx = shared_context(retriever.clone(), generator.clone());

        let result = run_section(&TaxWorker, &profile(&["Crypto staking"]), &ctx);

        assert!(retriever.calls().is_empty());
        assert!(generator.schemas_called().is_empty());
        let marker = result.topics().unwrap().get("Crypto staking").unwrap().marker().unwrap();
        assert_eq!(marker.kind, ErrorKind::UnmappedTopic);
    }

    #[test]
    fn duplicate_selections_collapse() {
        let retriever = Arc::new(StubRetriever::empty());
        let ctx = shared_context(retriever.clone(), Arc::new(StubGenerator::new()));

        let result = run_section(
            &TaxWorker,
            &profile(&["vat", "Value-added tax (VAT) registration and compliance"]),
            &ctx,
        );

        assert_eq!(result.topics().unwrap().len(), 1);
        assert_eq!(retriever.calls().len(), 1);
    }

    #[test]
    fn failing_topic_does_not_affect_siblings() {
        let ctx = shared_context(
            Arc::new(StubRetriever::with_passages(&["rules"])),
            Arc::new(StubGenerator::new().failing("vat", GenerationError::Timeout(120))),
        );

        let result = run_section(&TaxWorker, &profile(&["vat", "payroll-tax"]), &ctx);
        let topics = result.topics().unwrap();

        assert_eq!(topics.keys().collect::<Vec<_>>(), vec!["vat", "payroll-tax"]);
        assert_eq!(
            topics.get("vat").unwrap().marker().unwrap().kind,
            ErrorKind::GenerationFailure
        );
        assert!(topics.get("payroll-tax").unwrap().value().is_some());
    }

    #[test]
    fn missing_required_field_becomes_marker() {
        let ctx = shared_context(
            Arc::new(StubRetriever::with_passages(&["rules"])),
            Arc::new(StubGenerator::new().returning("corporate_income_tax", json!({"description": "no rate"}))),
        );

        let result = run_section(&TaxWorker, &profile(&["corporate-income-tax"]), &ctx);
        let entry = result.topics().unwrap().get("corporate-income-tax").unwrap();
        let marker = entry.marker().unwrap();
        assert_eq!(marker.kind, ErrorKind::GenerationFailure);
        assert!(marker.details.contains("standardRate"));
    }

    #[test]
    fn retrieval_outage_is_reported_per_topic() {
        let ctx = shared_context(Arc::new(StubRetriever::unavailable()), Arc::new(StubGenerator::new()));
        let result = run_section(&TaxWorker, &profile(&["withholding-tax"]), &ctx);
        let marker = result.topics().unwrap().get("withholding-tax").unwrap().marker().unwrap();
        assert_eq!(marker.kind, ErrorKind::RetrievalUnavailable);
    }

    #[test]
    fn empty_retrieval_still_generates() {
        let generator = Arc::new(StubGenerator::new());
        let ctx = shared_context(Arc::new(StubRetriever::empty()), generator.clone());

        let result = run_section(&TaxWorker, &profile(&["transfer-pricing"]), &ctx);

        assert!(result.topics().unwrap().get("transfer-pricing").unwrap().value().is_some());
        let prompts = generator.prompts();
        assert!(prompts[0].user.contains("No reference documents were found"));
    }

    #[test]
    fn overview_topics_share_schema() {
        assert_eq!(tax_schema(TaxTopic::PayrollTax), SchemaId::TaxTopicOverview);
        assert_eq!(tax_schema(TaxTopic::Vat), SchemaId::Vat);
    }
}

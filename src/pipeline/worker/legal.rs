use serde_json::Value;

use crate::models::{RequestProfile, SectionKind, SectionResult, TopicAnswers, TopicResults};
use crate::pipeline::prompt::LEGAL_SYSTEM_PROMPT;
use crate::pipeline::retrieval::RetrievalFilter;
use crate::pipeline::sanitize::{sanitize_user_text, MAX_FIELD_CHARS};
use crate::pipeline::schema::SchemaId;
use crate::pipeline::topics::LegalTopic;

use super::{
    generate_grounded, GroundedRequest, SectionError, SectionInput, SectionWorker, WorkerContext,
};

/// Legal & Business Topics: one entry per selected legal topic.
pub struct LegalWorker;

impl SectionWorker for LegalWorker {
    fn section(&self) -> SectionKind {
        SectionKind::LegalTopics
    }

    fn is_applicable(&self, profile: &RequestProfile) -> bool {
        !profile.legal_topics.is_empty()
    }

    fn produce(&self, input: &SectionInput<'_>, ctx: &WorkerContext) -> SectionResult {
        log_unselected_answers(input.profile);
        let empty = TopicAnswers::new();
        let mut topics = TopicResults::new();

        for label in &input.profile.legal_topics {
            let topic = match LegalTopic::resolve(label) {
                Ok(topic) => topic,
                Err(unmapped) => {
                    tracing::warn!(label = %label, "Unmapped legal topic, skipping retrieval");
                    let key = label.trim().to_string();
                    topics.insert(key, SectionError::from(unmapped).into_result(label.trim()));
                    continue;
                }
            };

            if topics.contains(topic.id()) {
                continue;
            }

            let answers = input.profile.topic_answers(topic.id(), label).unwrap_or(&empty);
            let result = match produce_topic(topic, answers, input, ctx) {
                Ok(value) => SectionResult::Generated(value),
                Err(e) => {
                    tracing::warn!(topic = topic.id(), error = %e, "Legal topic generation failed");
                    e.into_result(topic.title())
                }
            };
            topics.insert(topic.id(), result);
        }

        SectionResult::Topics(topics)
    }
}

fn produce_topic(
    topic: LegalTopic,
    answers: &TopicAnswers,
    input: &SectionInput<'_>,
    ctx: &WorkerContext,
) -> Result<Value, SectionError> {
    let query = legal_query(topic, answers, input.jurisdiction);
    let filter = RetrievalFilter::new(input.jurisdiction, topic.key());

    let mut lines = input.profile_lines.clone();
    let rendered = render_answers(answers);
    if !rendered.is_empty() {
        lines.push(format!("- {} Answers: {}", topic.title(), rendered.join("; ")));
    }

    generate_grounded(
        ctx,
        &GroundedRequest {
            subject: topic.title(),
            queries: vec![(query, filter)],
            system: LEGAL_SYSTEM_PROMPT,
            task: format!("the {} legal topic", topic.title()),
            schema: SchemaId::LegalTopicAnalysis,
            profile_lines: &lines,
        },
    )
}

/// Retrieval query for a legal topic, enriched with the user's answers.
pub(crate) fn legal_query(topic: LegalTopic, answers: &TopicAnswers, jurisdiction: &str) -> String {
    let jurisdiction = sanitize_user_text(jurisdiction, MAX_FIELD_CHARS);
    let mut query = format!("Legal requirements for {} in {jurisdiction}", topic.title());

    if topic == LegalTopic::EmploymentLaw && answer_is_yes(answers.get("hire-employees")) {
        match answers.get("employee-count").and_then(answer_text) {
            Some(count) => query.push_str(&format!(" for hiring {count} employees")),
            None => query.push_str(" for hiring employees"),
        }
    }

    let rendered = render_answers(answers);
    if !rendered.is_empty() {
        query.push_str(&format!(". {}", rendered.join("; ")));
    }
    query
}

/// `question: answer` pairs in key order, skipping empty answers.
fn render_answers(answers: &TopicAnswers) -> Vec<String> {
    answers
        .iter()
        .filter_map(|(question, answer)| {
            answer_text(answer).map(|text| {
                format!("{}: {text}", sanitize_user_text(question, MAX_FIELD_CHARS))
            })
        })
        .collect()
}

fn answer_text(answer: &Value) -> Option<String> {
    let text = match answer {
        Value::Null => return None,
        Value::String(s) => s.clone(),
        Value::Bool(true) => "Yes".to_string(),
        Value::Bool(false) => "No".to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(answer_text)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => answer.to_string(),
    };
    let text = sanitize_user_text(&text, MAX_FIELD_CHARS);
    (!text.is_empty()).then_some(text)
}

fn answer_is_yes(answer: Option<&Value>) -> bool {
    match answer {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("yes"),
        _ => false,
    }
}

fn log_unselected_answers(profile: &RequestProfile) {
    for key in profile.legal_topic_data.keys() {
        let selected = profile.legal_topics.iter().any(|label| {
            label == key
                || LegalTopic::resolve(label)
                    .map(|t| t.id() == key.as_str())
                    .unwrap_or(false)
        });
        if !selected {
            tracing::debug!(topic = %key, "Ignoring answers for unselected legal topic");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ErrorKind;
    use crate::pipeline::testing::{shared_context, StubGenerator, StubRetriever};
    use crate::pipeline::worker::run_section;
    use serde_json::json;
    use std::sync::Arc;

    fn answers(pairs: &[(&str, Value)]) -> TopicAnswers {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn employment_query_includes_headcount() {
        let a = answers(&[("hire-employees", json!("Yes")), ("employee-count", json!("10"))]);
        let query = legal_query(LegalTopic::EmploymentLaw, &a, "Netherlands");
        assert!(query.starts_with(
            "Legal requirements for Employment Law in Netherlands for hiring 10 employees"
        ));
        assert!(query.ends_with(". employee-count: 10; hire-employees: Yes"));
    }

    #[test]
    fn employment_query_without_headcount() {
        let a = answers(&[("hire-employees", json!(true))]);
        let query = legal_query(LegalTopic::EmploymentLaw, &a, "Germany");
        assert!(query.starts_with("Legal requirements for Employment Law in Germany for hiring employees"));
    }

    #[test]
    fn no_hiring_means_no_hiring_clause() {
        let a = answers(&[("hire-employees", json!("No"))]);
        let query = legal_query(LegalTopic::EmploymentLaw, &a, "Germany");
        assert!(!query.contains("for hiring"));
    }

    #[test]
    fn plain_topic_query_without_answers() {
        let query = legal_query(LegalTopic::DataProtection, &TopicAnswers::new(), "France");
        assert_eq!(query, "Legal requirements for Data Protection in France");
    }

    #[test]
    fn answers_render_in_key_order() {
        let a = answers(&[
            ("setup-priority", json!("Speed")),
            ("entity-type", json!("Limited Liability Company")),
            ("local-directors", Value::Null),
            ("regions", json!(["EU", "UK"])),
        ]);
        assert_eq!(
            render_answers(&a),
            vec![
                "entity-type: Limited Liability Company",
                "regions: EU, UK",
                "setup-priority: Speed",
            ]
        );
    }

    #[test]
    fn worker_filters_on_topic_key_and_uses_answers_by_label() {
        let retriever = Arc::new(StubRetriever::with_passages(&["GDPR applies."]));
        let generator = Arc::new(StubGenerator::new());
        let ctx = shared_context(retriever.clone(), generator.clone());

        let mut profile = RequestProfile {
            primary_jurisdiction: Some("Netherlands".into()),
            legal_topics: vec!["Data Protection".into()],
            ..Default::default()
        };
        profile.legal_topic_data.insert(
            "Data Protection".into(),
            answers(&[("gdpr-readiness", json!("Partially"))]),
        );

        let result = run_section(&LegalWorker, &profile, &ctx);

        let calls = retriever.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].filter.topic(), "data_protection");
        assert!(calls[0].query.contains("gdpr-readiness: Partially"));
        assert!(generator.prompts()[0]
            .user
            .contains("- Data Protection Answers: gdpr-readiness: Partially"));
        assert!(result.topics().unwrap().get("data-protection").unwrap().value().is_some());
        assert_eq!(generator.schemas_called(), vec!["legal_topic_analysis"]);
    }

    #[test]
    fn unmapped_legal_topic_is_marked() {
        let ctx = shared_context(Arc::new(StubRetriever::empty()), Arc::new(StubGenerator::new()));
        let profile = RequestProfile {
            primary_jurisdiction: Some("Netherlands".into()),
            legal_topics: vec!["Maritime law".into(), "immigration".into()],
            ..Default::default()
        };
        let result = run_section(&LegalWorker, &profile, &ctx);
        let topics = result.topics().unwrap();
        assert_eq!(
            topics.get("Maritime law").unwrap().marker().unwrap().kind,
            ErrorKind::UnmappedTopic
        );
        assert!(topics.get("immigration").unwrap().value().is_some());
    }

    #[test]
    fn answers_for_unselected_topics_are_ignored() {
        let retriever = Arc::new(StubRetriever::empty());
        let ctx = shared_context(retriever.clone(), Arc::new(StubGenerator::new()));
        let mut profile = RequestProfile {
            primary_jurisdiction: Some("Netherlands".into()),
            legal_topics: vec!["corporate-law".into()],
            ..Default::default()
        };
        profile
            .legal_topic_data
            .insert("employment-law".into(), answers(&[("hire-employees", json!("Yes"))]));

        let result = run_section(&LegalWorker, &profile, &ctx);

        assert_eq!(result.topics().unwrap().len(), 1);
        assert!(!retriever.calls()[0].query.contains("hire"));
    }
}

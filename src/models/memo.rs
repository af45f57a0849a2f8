use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Value;

use super::enums::{ErrorKind, SectionKind};

/// Placeholder emitted instead of a payload when a section or topic failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorMarker {
    pub error: String,
    pub kind: ErrorKind,
    pub details: String,
}

impl ErrorMarker {
    pub fn new(kind: ErrorKind, error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            kind,
            details: details.into(),
        }
    }
}

/// Outcome of one section (or one topic within a topical section).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SectionResult {
    Generated(Value),
    Failed(ErrorMarker),
    Topics(TopicResults),
}

impl SectionResult {
    pub fn failed(kind: ErrorKind, error: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Failed(ErrorMarker::new(kind, error, details))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn marker(&self) -> Option<&ErrorMarker> {
        match self {
            Self::Failed(marker) => Some(marker),
            _ => None,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Generated(value) => Some(value),
            _ => None,
        }
    }

    pub fn topics(&self) -> Option<&TopicResults> {
        match self {
            Self::Topics(topics) => Some(topics),
            _ => None,
        }
    }

    /// Error markers in this result, one per failed topic for topical sections.
    pub fn failure_count(&self) -> usize {
        match self {
            Self::Generated(_) => 0,
            Self::Failed(_) => 1,
            Self::Topics(topics) => topics.iter().map(|(_, r)| r.failure_count()).sum(),
        }
    }
}

/// Per-topic results in selection order, serialized as a JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopicResults {
    entries: Vec<(String, SectionResult)>,
}

impl TopicResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. A key that is already present keeps its first result.
    pub fn insert(&mut self, key: impl Into<String>, result: SectionResult) {
        let key = key.into();
        if self.contains(&key) {
            return;
        }
        self.entries.push((key, result));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn get(&self, key: &str) -> Option<&SectionResult> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, r)| r)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SectionResult)> {
        self.entries.iter().map(|(k, r)| (k.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for TopicResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, result) in &self.entries {
            map.serialize_entry(key, result)?;
        }
        map.end()
    }
}

/// The assembled memo: section title → result, in plan order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoDocument {
    sections: Vec<(SectionKind, SectionResult)>,
}

impl MemoDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a section result. Later results for the same section replace
    /// the earlier one without changing its position.
    pub fn insert(&mut self, kind: SectionKind, result: SectionResult) {
        match self.sections.iter_mut().find(|(k, _)| *k == kind) {
            Some(slot) => slot.1 = result,
            None => self.sections.push((kind, result)),
        }
    }

    pub fn get(&self, kind: SectionKind) -> Option<&SectionResult> {
        self.sections.iter().find(|(k, _)| *k == kind).map(|(_, r)| r)
    }

    pub fn contains(&self, kind: SectionKind) -> bool {
        self.get(kind).is_some()
    }

    pub fn kinds(&self) -> impl Iterator<Item = SectionKind> + '_ {
        self.sections.iter().map(|(k, _)| *k)
    }

    pub fn titles(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.sections.iter().map(|(k, _)| k.title())
    }

    /// Error markers across the memo, counting failed topics individually.
    pub fn failed_count(&self) -> usize {
        self.sections.iter().map(|(_, r)| r.failure_count()).sum()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

impl Serialize for MemoDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.sections.len()))?;
        for (kind, result) in &self.sections {
            map.serialize_entry(kind.title(), result)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn marker_serializes_with_kind() {
        let result = SectionResult::failed(
            ErrorKind::GenerationFailure,
            "Failed to generate Risk Assessment.",
            "model returned invalid JSON",
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            json!({
                "error": "Failed to generate Risk Assessment.",
                "kind": "generation_failure",
                "details": "model returned invalid JSON"
            })
        );
    }

    #[test]
    fn generated_value_serializes_verbatim() {
        let value = json!({"standardRate": "25.8%", "strategies": []});
        let json = serde_json::to_value(SectionResult::Generated(value.clone())).unwrap();
        assert_eq!(json, value);
    }

    #[test]
    fn topic_results_keep_selection_order() {
        let mut topics = TopicResults::new();
        topics.insert("vat", SectionResult::Generated(json!({"a": 1})));
        topics.insert("corporate-income-tax", SectionResult::Generated(json!({"b": 2})));
        topics.insert("vat", SectionResult::Generated(json!({"c": 3})));

        assert_eq!(topics.len(), 2);
        assert_eq!(topics.get("vat"), Some(&SectionResult::Generated(json!({"a": 1}))));

        let text = serde_json::to_string(&SectionResult::Topics(topics)).unwrap();
        assert_eq!(text, r#"{"vat":{"a":1},"corporate-income-tax":{"b":2}}"#);
    }

    #[test]
    fn memo_serializes_titles_in_insertion_order() {
        let mut memo = MemoDocument::new();
        memo.insert(SectionKind::RiskAssessment, SectionResult::Generated(json!({})));
        memo.insert(SectionKind::ExecutiveSummary, SectionResult::Generated(json!({})));

        let text = serde_json::to_string(&memo).unwrap();
        assert_eq!(text, r#"{"Risk Assessment":{},"Executive Summary":{}}"#);
    }

    #[test]
    fn reinserting_a_section_replaces_in_place() {
        let mut memo = MemoDocument::new();
        memo.insert(SectionKind::ExecutiveSummary, SectionResult::Generated(json!(1)));
        memo.insert(SectionKind::NextSteps, SectionResult::Generated(json!(2)));
        memo.insert(
            SectionKind::ExecutiveSummary,
            SectionResult::failed(ErrorKind::Timeout, "late", ""),
        );

        assert_eq!(memo.len(), 2);
        assert_eq!(memo.kinds().next(), Some(SectionKind::ExecutiveSummary));
        assert_eq!(memo.failed_count(), 1);
    }

    #[test]
    fn failed_count_includes_topic_markers() {
        let mut tax = TopicResults::new();
        tax.insert(
            "vat",
            SectionResult::failed(ErrorKind::GenerationFailure, "Failed to generate VAT data.", ""),
        );
        tax.insert(
            "corporate-income-tax",
            SectionResult::failed(ErrorKind::RetrievalUnavailable, "Failed", "down"),
        );
        let mut legal = TopicResults::new();
        legal.insert("employment-law", SectionResult::Generated(json!({})));

        let mut memo = MemoDocument::new();
        memo.insert(SectionKind::TaxCompliance, SectionResult::Topics(tax));
        memo.insert(SectionKind::LegalTopics, SectionResult::Topics(legal));
        memo.insert(
            SectionKind::RiskAssessment,
            SectionResult::failed(ErrorKind::Timeout, "late", ""),
        );
        memo.insert(SectionKind::NextSteps, SectionResult::Generated(json!({})));

        assert_eq!(memo.get(SectionKind::TaxCompliance).unwrap().failure_count(), 2);
        assert_eq!(memo.failed_count(), 3);
    }
}

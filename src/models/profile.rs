use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Answers to the follow-up questions of one legal topic, keyed by question id.
pub type TopicAnswers = BTreeMap<String, serde_json::Value>;

/// The business profile a memo is generated for.
///
/// Built once from the request body and only read afterwards. Every field
/// defaults when absent, and list or map fields also when `null`, so
/// partially filled forms still produce a memo.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestProfile {
    // Business profile
    pub business_name: Option<String>,
    pub industry: Option<String>,
    pub company_size: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub current_markets: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub entry_goals: Vec<String>,
    pub timeline: Option<String>,

    // Jurisdiction
    pub primary_jurisdiction: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub secondary_jurisdictions: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub tax_treaties: Vec<String>,

    // Business structure
    pub business_structure: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub companies: Vec<Company>,
    #[serde(deserialize_with = "null_as_default")]
    pub relationships: Vec<Relationship>,

    // Tax considerations
    #[serde(alias = "taxQueries", deserialize_with = "null_as_default")]
    pub tax_topics: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub transaction_types: Vec<String>,
    pub specific_concerns: Option<String>,

    // Legal topics
    #[serde(alias = "selectedLegalTopics", deserialize_with = "null_as_default")]
    pub legal_topics: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub legal_topic_data: BTreeMap<String, TopicAnswers>,

    // Entry options
    #[serde(deserialize_with = "null_as_default")]
    pub target_markets: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub activities: Vec<String>,
    pub expected_revenue: Option<String>,
    pub entry_option: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub compliance_priorities: Vec<String>,

    pub memo_name: Option<String>,
}

/// A company entity in the planned business structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Company {
    pub id: String,
    pub name: String,
    pub country: String,
    /// "Holding", "Operating", "Service", "IP", "Financing"
    #[serde(rename = "type")]
    pub kind: String,
}

/// A relationship between two companies of the structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Relationship {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    /// "Ownership", "Service Agreement", "Licensing", "Financing"
    #[serde(rename = "type")]
    pub kind: String,
    pub percentage: Option<String>,
}

impl RequestProfile {
    /// Primary jurisdiction, trimmed. `None` when missing or blank.
    pub fn jurisdiction(&self) -> Option<&str> {
        non_blank(self.primary_jurisdiction.as_deref())
    }

    pub fn industry(&self) -> Option<&str> {
        non_blank(self.industry.as_deref())
    }

    pub fn company_size(&self) -> Option<&str> {
        non_blank(self.company_size.as_deref())
    }

    pub fn specific_concerns(&self) -> Option<&str> {
        non_blank(self.specific_concerns.as_deref())
    }

    /// Answers recorded for a legal topic.
    ///
    /// Clients key answers either by topic id or by the label they selected,
    /// so both are tried.
    pub fn topic_answers(&self, topic_id: &str, label: &str) -> Option<&TopicAnswers> {
        self.legal_topic_data
            .get(topic_id)
            .or_else(|| self.legal_topic_data.get(label))
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub mod embedder;
#[cfg(test)]
pub(crate) mod memory;
pub mod qdrant;

pub use embedder::{EmbeddingModel, OllamaEmbedder};
pub use qdrant::QdrantRetriever;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Retrieval service unavailable: {0}")]
    Unavailable(String),

    #[error("Query embedding failed: {0}")]
    Embedding(String),

    #[error("Invalid retrieval request: {0}")]
    InvalidRequest(String),

    #[error("Malformed retrieval response: {0}")]
    MalformedResponse(String),
}

/// Exact-match metadata constraints applied before ranking.
///
/// Both keys are always present: `country` holds the lowercased, trimmed
/// jurisdiction and `topic` a corpus topic key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetrievalFilter {
    country: String,
    topic: String,
}

impl RetrievalFilter {
    pub const KEYS: [&'static str; 2] = ["country", "topic"];

    /// The country is trimmed and lowercased only. Inner spaces are kept.
    pub fn new(jurisdiction: &str, topic_key: &str) -> Self {
        Self {
            country: jurisdiction.trim().to_lowercase(),
            topic: topic_key.to_string(),
        }
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            "country" => Some(&self.country),
            "topic" => Some(&self.topic),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [("country", self.country.as_str()), ("topic", self.topic.as_str())].into_iter()
    }

    /// True when every constraint equals the corresponding metadata value.
    pub fn matches(&self, metadata: &PassageMetadata) -> bool {
        metadata.country.as_deref() == Some(self.country.as_str())
            && metadata.topic.as_deref() == Some(self.topic.as_str())
    }
}

/// Metadata written next to each chunk by the ingestion job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassageMetadata {
    pub source: Option<String>,
    pub topic: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedPassage {
    pub content: String,
    pub metadata: PassageMetadata,
    pub score: f32,
    /// 1-based position in the service's relevance order.
    pub rank: usize,
}

/// Similarity search over the document corpus.
///
/// Results come back in the service's relevance order, at most `k` of them,
/// all satisfying `filter`. No match is an empty vector, not an error.
pub trait RetrievalClient: Send + Sync {
    fn search(
        &self,
        query: &str,
        filter: &RetrievalFilter,
        k: usize,
    ) -> Result<Vec<RetrievedPassage>, RetrievalError>;
}

pub(crate) fn check_k(k: usize) -> Result<(), RetrievalError> {
    if k == 0 {
        return Err(RetrievalError::InvalidRequest(
            "k must be at least 1".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_lowercases_jurisdiction() {
        let filter = RetrievalFilter::new("Netherlands", "corporate_income_tax");
        assert_eq!(filter.get("country"), Some("netherlands"));
        assert_eq!(filter.get("topic"), Some("corporate_income_tax"));
        assert_eq!(filter.get("industry"), None);
    }

    #[test]
    fn filter_trims_jurisdiction() {
        let filter = RetrievalFilter::new("  United Kingdom ", "vat");
        assert_eq!(filter.country(), "united kingdom");
    }

    #[test]
    fn multi_word_country_does_not_match_underscored_metadata() {
        let filter = RetrievalFilter::new("United Kingdom", "vat");
        let metadata = PassageMetadata {
            source: Some("uk_vat.pdf".into()),
            topic: Some("vat".into()),
            country: Some("united_kingdom".into()),
        };
        assert!(!filter.matches(&metadata));
    }

    #[test]
    fn filter_iterates_fixed_keys() {
        let filter = RetrievalFilter::new("Germany", "vat");
        let pairs: Vec<_> = filter.iter().collect();
        assert_eq!(pairs, vec![("country", "germany"), ("topic", "vat")]);
    }

    #[test]
    fn filter_matches_exact_metadata_only() {
        let filter = RetrievalFilter::new("Germany", "vat");
        let hit = PassageMetadata {
            source: Some("de_vat.pdf".into()),
            topic: Some("vat".into()),
            country: Some("germany".into()),
        };
        let wrong_topic = PassageMetadata {
            topic: Some("vat_digital_services".into()),
            ..hit.clone()
        };
        let untagged = PassageMetadata::default();

        assert!(filter.matches(&hit));
        assert!(!filter.matches(&wrong_topic));
        assert!(!filter.matches(&untagged));
    }

    #[test]
    fn zero_k_is_invalid() {
        assert!(matches!(check_k(0), Err(RetrievalError::InvalidRequest(_))));
        assert!(check_k(1).is_ok());
    }
}

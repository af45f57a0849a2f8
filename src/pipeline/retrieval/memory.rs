//! In-process retrieval over a small corpus, used to drive the pipeline
//! end to end without a vector service.

use std::sync::Arc;

use super::{
    check_k, EmbeddingModel, PassageMetadata, RetrievalClient, RetrievalError, RetrievalFilter,
    RetrievedPassage,
};

/// In-process corpus ranked by cosine similarity.
///
/// Entries are pre-filtered on exact metadata before scoring, matching the
/// production service's filter semantics.
pub struct InMemoryRetriever {
    embedder: Arc<dyn EmbeddingModel>,
    entries: Vec<StoredPassage>,
}

struct StoredPassage {
    content: String,
    metadata: PassageMetadata,
    embedding: Vec<f32>,
}

impl InMemoryRetriever {
    pub fn new(embedder: Arc<dyn EmbeddingModel>) -> Self {
        Self {
            embedder,
            entries: Vec::new(),
        }
    }

    /// Embed and store one passage.
    pub fn add(
        &mut self,
        content: &str,
        country: &str,
        topic: &str,
        source: &str,
    ) -> Result<(), RetrievalError> {
        let embedding = self.embedder.embed(content)?;
        self.entries.push(StoredPassage {
            content: content.to_string(),
            metadata: PassageMetadata {
                source: Some(source.to_string()),
                topic: Some(topic.to_string()),
                country: Some(country.trim().to_lowercase()),
            },
            embedding,
        });
        Ok(())
    }
}

impl RetrievalClient for InMemoryRetriever {
    fn search(
        &self,
        query: &str,
        filter: &RetrievalFilter,
        k: usize,
    ) -> Result<Vec<RetrievedPassage>, RetrievalError> {
        check_k(k)?;
        let query_embedding = self.embedder.embed(query)?;

        let mut scored: Vec<(f32, &StoredPassage)> = self
            .entries
            .iter()
            .filter(|entry| filter.matches(&entry.metadata))
            .map(|entry| (cosine_similarity(&query_embedding, &entry.embedding), entry))
            .collect();

        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(k)
            .enumerate()
            .map(|(i, (score, entry))| RetrievedPassage {
                content: entry.content.clone(),
                metadata: entry.metadata.clone(),
                score,
                rank: i + 1,
            })
            .collect())
    }
}

/// Deterministic embedder for the in-memory corpus.
///
/// Produces a unit vector from the text's bytes, so identical text always
/// embeds identically.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(64)
    }
}

impl EmbeddingModel for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        let mut vec = vec![0.0f32; self.dimension];
        for (i, byte) in text.to_lowercase().bytes().enumerate() {
            vec[(byte as usize + i) % self.dimension] += 1.0;
        }

        let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut vec {
                *val /= norm;
            }
        }
        Ok(vec)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> InMemoryRetriever {
        let mut retriever = InMemoryRetriever::new(Arc::new(HashEmbedder::default()));
        retriever
            .add("Dutch CIT is 19% up to 200k and 25.8% above.", "Netherlands", "corporate_income_tax", "nl_cit.pdf")
            .unwrap();
        retriever
            .add("Dutch VAT standard rate is 21%.", "netherlands", "vat", "nl_vat.pdf")
            .unwrap();
        retriever
            .add("German CIT is 15% plus solidarity surcharge.", "germany", "corporate_income_tax", "de_cit.pdf")
            .unwrap();
        retriever
            .add("Innovation box taxes qualifying IP income at 9%.", "netherlands", "corporate_income_tax", "nl_ip.pdf")
            .unwrap();
        retriever
    }

    #[test]
    fn only_returns_passages_matching_filter() {
        let retriever = corpus();
        let filter = RetrievalFilter::new("Netherlands", "corporate_income_tax");
        let passages = retriever.search("corporate income tax rate", &filter, 10).unwrap();

        assert_eq!(passages.len(), 2);
        for passage in &passages {
            assert!(filter.matches(&passage.metadata));
        }
    }

    #[test]
    fn respects_k_and_ranks_from_one() {
        let retriever = corpus();
        let filter = RetrievalFilter::new("netherlands", "corporate_income_tax");
        let passages = retriever.search("CIT", &filter, 1).unwrap();
        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].rank, 1);
    }

    #[test]
    fn results_are_ordered_by_score() {
        let retriever = corpus();
        let filter = RetrievalFilter::new("netherlands", "corporate_income_tax");
        let passages = retriever.search("Innovation box IP income", &filter, 3).unwrap();
        assert!(passages.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn no_match_is_empty() {
        let retriever = corpus();
        let filter = RetrievalFilter::new("France", "vat");
        assert!(retriever.search("VAT", &filter, 3).unwrap().is_empty());
    }

    #[test]
    fn zero_k_is_invalid() {
        let retriever = corpus();
        let filter = RetrievalFilter::new("netherlands", "vat");
        assert!(matches!(
            retriever.search("VAT", &filter, 0),
            Err(RetrievalError::InvalidRequest(_))
        ));
    }

    #[test]
    fn hash_embedder_is_deterministic() {
        let embedder = HashEmbedder::default();
        let a = embedder.embed("VAT rules in Germany").unwrap();
        let b = embedder.embed("VAT rules in Germany").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn hash_embedder_returns_unit_vectors() {
        let v = HashEmbedder::new(16).embed("payroll").unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_embeds_to_zero_vector() {
        let v = HashEmbedder::new(8).embed("").unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn cosine_handles_degenerate_vectors() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
    }
}

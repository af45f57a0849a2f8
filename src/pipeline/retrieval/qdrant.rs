use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};

use super::{
    check_k, EmbeddingModel, PassageMetadata, RetrievalClient, RetrievalError, RetrievalFilter,
    RetrievedPassage,
};

/// Retrieval over a Qdrant collection through its REST search endpoint.
///
/// Points carry the payload layout written by the ingestion job: the chunk
/// text under `page_content` and `{source, topic, country}` under `metadata`.
pub struct QdrantRetriever {
    base_url: String,
    collection: String,
    api_key: Option<String>,
    embedder: Arc<dyn EmbeddingModel>,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl QdrantRetriever {
    pub fn new(
        base_url: &str,
        collection: &str,
        api_key: Option<String>,
        embedder: Arc<dyn EmbeddingModel>,
        timeout_secs: u64,
    ) -> Result<Self, RetrievalError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RetrievalError::Unavailable(format!("HTTP client init failed: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            collection: collection.to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            embedder,
            client,
            timeout_secs,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

/// Search request body: filter conditions address the nested metadata keys.
pub(crate) fn search_body(vector: &[f32], filter: &RetrievalFilter, k: usize) -> Value {
    let must: Vec<Value> = filter
        .iter()
        .map(|(key, value)| {
            json!({
                "key": format!("metadata.{key}"),
                "match": {"value": value},
            })
        })
        .collect();

    json!({
        "vector": vector,
        "limit": k,
        "with_payload": true,
        "filter": {"must": must},
    })
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<ScoredPoint>,
}

#[derive(Deserialize)]
struct ScoredPoint {
    score: f32,
    #[serde(default)]
    payload: Option<PointPayload>,
}

#[derive(Deserialize)]
struct PointPayload {
    #[serde(default)]
    page_content: String,
    #[serde(default)]
    metadata: PassageMetadata,
}

pub(crate) fn parse_search_response(
    body: &str,
    k: usize,
) -> Result<Vec<RetrievedPassage>, RetrievalError> {
    let parsed: SearchResponse = serde_json::from_str(body)
        .map_err(|e| RetrievalError::MalformedResponse(e.to_string()))?;

    Ok(parsed
        .result
        .into_iter()
        .filter_map(|point| point.payload.map(|payload| (point.score, payload)))
        .take(k)
        .enumerate()
        .map(|(i, (score, payload))| RetrievedPassage {
            content: payload.page_content,
            metadata: payload.metadata,
            score,
            rank: i + 1,
        })
        .collect())
}

impl RetrievalClient for QdrantRetriever {
    fn search(
        &self,
        query: &str,
        filter: &RetrievalFilter,
        k: usize,
    ) -> Result<Vec<RetrievedPassage>, RetrievalError> {
        check_k(k)?;
        let vector = self.embedder.embed(query).map_err(|e| match e {
            RetrievalError::Embedding(msg) => RetrievalError::Unavailable(msg),
            other => other,
        })?;

        let url = format!(
            "{}/collections/{}/points/search",
            self.base_url, self.collection
        );
        let mut request = self.client.post(&url).json(&search_body(&vector, filter, k));
        if let Some(key) = &self.api_key {
            request = request.header("api-key", key);
        }

        let response = request.send().map_err(|e| {
            if e.is_connect() {
                RetrievalError::Unavailable(format!("Qdrant unreachable at {}", self.base_url))
            } else if e.is_timeout() {
                RetrievalError::Unavailable(format!(
                    "Qdrant search timed out after {}s",
                    self.timeout_secs
                ))
            } else {
                RetrievalError::Unavailable(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| RetrievalError::Unavailable(e.to_string()))?;
        if !status.is_success() {
            return Err(RetrievalError::Unavailable(format!(
                "Qdrant returned {}: {body}",
                status.as_u16()
            )));
        }

        let passages = parse_search_response(&body, k)?;
        tracing::debug!(
            collection = %self.collection,
            country = filter.country(),
            topic = filter.topic(),
            hits = passages.len(),
            "Qdrant search complete"
        );
        Ok(passages)
    }
}

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::RetrievalError;

/// Turns query text into the vector the similarity service searches with.
pub trait EmbeddingModel: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError>;
}

/// Embeddings served by a local Ollama instance.
pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaEmbedder {
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Result<Self, RetrievalError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| RetrievalError::Embedding(format!("HTTP client init failed: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Request body for Ollama /api/embed
#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

/// Response body from Ollama /api/embed
#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl EmbeddingModel for OllamaEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        let url = format!("{}/api/embed", self.base_url);
        let body = EmbedRequest {
            model: &self.model,
            input: text,
        };

        let response = self.client.post(&url).json(&body).send().map_err(|e| {
            if e.is_connect() {
                RetrievalError::Unavailable(format!("Ollama unreachable at {}", self.base_url))
            } else if e.is_timeout() {
                RetrievalError::Unavailable(format!(
                    "Embedding request timed out after {}s",
                    self.timeout_secs
                ))
            } else {
                RetrievalError::Embedding(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(RetrievalError::Embedding(format!(
                "Ollama returned {}: {body}",
                status.as_u16()
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .map_err(|e| RetrievalError::MalformedResponse(e.to_string()))?;

        parsed
            .embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| RetrievalError::MalformedResponse("empty embedding".to_string()))
    }
}

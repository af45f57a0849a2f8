use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::pipeline::generation::DEFAULT_MAX_ATTEMPTS;
use crate::pipeline_config::{
    PipelineConfig, DEFAULT_MAX_CONTEXT_CHARS, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_TOP_K,
};

/// Application-level constants
pub const APP_NAME: &str = "TaxMemo";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Collection the ingestion job writes to.
pub const DEFAULT_COLLECTION: &str = "tax_memo_production";

pub const DEFAULT_BIND: &str = "0.0.0.0:8000";
pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000";
pub const DEFAULT_QDRANT_HOST: &str = "http://localhost:6333";
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
pub const DEFAULT_GENERATION_MODEL: &str = "llama3.1:8b";
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 120;

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "taxmemo_lib=info,taxmemo=info,tower_http=warn"
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalConfig {
    pub qdrant_host: String,
    pub api_key: Option<String>,
    pub collection: String,
    pub embedding_model: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub ollama_host: String,
    pub model: String,
    pub max_attempts: usize,
    pub call_timeout: Duration,
}

/// Everything the service reads from its environment.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub retrieval: RetrievalConfig,
    pub generation: GenerationConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let text = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let bind_raw = text("TAXMEMO_BIND", DEFAULT_BIND);
        let bind = bind_raw.parse::<SocketAddr>().map_err(|e| ConfigError::Invalid {
            key: "TAXMEMO_BIND",
            value: bind_raw.clone(),
            reason: e.to_string(),
        })?;

        let cors_origins = text("TAXMEMO_CORS_ORIGINS", DEFAULT_CORS_ORIGINS)
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();

        let qdrant_host = text("QDRANT_HOST", DEFAULT_QDRANT_HOST);
        check_url("QDRANT_HOST", &qdrant_host)?;
        let ollama_host = text("OLLAMA_HOST", DEFAULT_OLLAMA_HOST);
        check_url("OLLAMA_HOST", &ollama_host)?;

        let call_timeout_secs =
            positive(&get, "TAXMEMO_CALL_TIMEOUT_SECS", DEFAULT_CALL_TIMEOUT_SECS as usize)?;
        let request_timeout_secs = positive(
            &get,
            "TAXMEMO_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS as usize,
        )?;

        Ok(Self {
            server: ServerConfig { bind, cors_origins },
            retrieval: RetrievalConfig {
                qdrant_host,
                api_key: get("QDRANT_API_KEY"),
                collection: text("QDRANT_COLLECTION", DEFAULT_COLLECTION),
                embedding_model: text("TAXMEMO_EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
            },
            generation: GenerationConfig {
                ollama_host,
                model: text("TAXMEMO_GENERATION_MODEL", DEFAULT_GENERATION_MODEL),
                max_attempts: positive(&get, "TAXMEMO_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?,
                call_timeout: Duration::from_secs(call_timeout_secs as u64),
            },
            pipeline: PipelineConfig {
                top_k: positive(&get, "TAXMEMO_TOP_K", DEFAULT_TOP_K)?,
                max_context_chars: positive(
                    &get,
                    "TAXMEMO_MAX_CONTEXT_CHARS",
                    DEFAULT_MAX_CONTEXT_CHARS,
                )?,
                request_timeout: Duration::from_secs(request_timeout_secs as u64),
            },
        })
    }
}

fn positive<G>(get: &G, key: &'static str, default: usize) -> Result<usize, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(key) else {
        return Ok(default);
    };
    match raw.parse::<usize>() {
        Ok(0) => Err(ConfigError::Invalid {
            key,
            value: raw,
            reason: "must be at least 1".to_string(),
        }),
        Ok(n) => Ok(n),
        Err(e) => Err(ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

fn check_url(key: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: "expected an http(s) URL".to_string(),
        })
    }
}

//! Per-request pipeline settings.
//!
//! How many passages each retrieval query returns, how much retrieved text a
//! prompt may carry, and how long a whole memo may take before unfinished
//! sections are reported as timed out.

use std::time::Duration;

use serde::Serialize;

/// Passages requested per retrieval query.
pub const DEFAULT_TOP_K: usize = 3;

/// Character budget for the assembled context of one generation call.
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 12_000;

/// Deadline for a whole memo.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineConfig {
    pub top_k: usize,
    pub max_context_chars: usize,
    #[serde(serialize_with = "as_secs")]
    pub request_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

fn as_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_secs())
}

pub mod context;
pub mod generation;
pub mod orchestrator; // Plan → fan-out → fan-in with per-section isolation
pub mod plan;
pub mod prompt;
pub mod retrieval;
pub mod sanitize;
pub mod schema;
pub mod topics; // Tax/legal/corpus topic registry
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use orchestrator::MemoOrchestrator;

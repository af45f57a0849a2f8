//! Memo orchestrator.
//!
//! Plans the memo for a profile, runs one worker per planned section and
//! assembles the results in plan order. Never fails: workers report their own
//! errors as markers, and the orchestrator turns a missed deadline or a
//! panicking worker into a marker for that section alone.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use futures_util::future::join_all;

use super::plan::{build_plan, ALWAYS_INCLUDED};
use super::worker::{run_section, LegalWorker, NarrativeWorker, SectionWorker, TaxWorker, WorkerContext};
use crate::models::{ErrorKind, MemoDocument, RequestProfile, SectionKind, SectionResult};

/// Runs section workers against a shared [`WorkerContext`].
pub struct MemoOrchestrator {
    ctx: WorkerContext,
    workers: Vec<Arc<dyn SectionWorker>>,
}

impl MemoOrchestrator {
    /// Orchestrator with a worker for every section kind.
    pub fn new(ctx: WorkerContext) -> Self {
        Self::with_workers(ctx, default_workers())
    }

    pub fn with_workers(ctx: WorkerContext, workers: Vec<Arc<dyn SectionWorker>>) -> Self {
        Self { ctx, workers }
    }

    pub fn context(&self) -> &WorkerContext {
        &self.ctx
    }

    fn worker_for(&self, kind: SectionKind) -> Option<Arc<dyn SectionWorker>> {
        self.workers.iter().find(|w| w.section() == kind).cloned()
    }

    /// Produce the memo on the calling thread, one section after another.
    pub fn run(&self, profile: &RequestProfile) -> MemoDocument {
        let started = Instant::now();
        let mut memo = MemoDocument::new();

        for kind in build_plan(profile) {
            let result = match self.worker_for(kind) {
                Some(worker) => {
                    catch_unwind(AssertUnwindSafe(|| run_section(worker.as_ref(), profile, &self.ctx)))
                        .unwrap_or_else(|payload| panicked(kind, &panic_message(payload.as_ref())))
                }
                None => missing_worker(kind),
            };
            memo.insert(kind, result);
        }

        log_outcome(&memo, started);
        memo
    }

    /// Produce the memo with every section running on the blocking pool.
    ///
    /// All sections share one deadline, `request_timeout` from the pipeline
    /// settings. A section still running at the deadline is reported as a
    /// `timeout` marker; its blocking task runs to completion in the
    /// background and the late result is dropped.
    pub async fn run_concurrent(&self, profile: Arc<RequestProfile>) -> MemoDocument {
        let started = Instant::now();
        let plan = build_plan(&profile);
        let budget = self.ctx.settings.request_timeout;
        let deadline = tokio::time::Instant::now() + budget;

        tracing::info!(sections = plan.len(), "Generating memo");

        let tasks = plan.iter().map(|&kind| {
            let worker = self.worker_for(kind);
            let ctx = self.ctx.clone();
            let profile = Arc::clone(&profile);
            async move {
                let Some(worker) = worker else {
                    return (kind, missing_worker(kind));
                };
                let handle = tokio::task::spawn_blocking(move || {
                    run_section(worker.as_ref(), &profile, &ctx)
                });
                let result = match tokio::time::timeout_at(deadline, handle).await {
                    Ok(Ok(result)) => result,
                    Ok(Err(e)) if e.is_panic() => {
                        panicked(kind, &panic_message(e.into_panic().as_ref()))
                    }
                    Ok(Err(e)) => {
                        tracing::error!(section = kind.as_str(), error = %e, "Section task failed");
                        SectionResult::failed(
                            ErrorKind::Internal,
                            format!("Failed to generate {} data.", kind.title()),
                            e.to_string(),
                        )
                    }
                    Err(_) => {
                        tracing::warn!(
                            section = kind.as_str(),
                            timeout_ms = budget.as_millis() as u64,
                            "Section missed the request deadline"
                        );
                        SectionResult::failed(
                            ErrorKind::Timeout,
                            format!("Failed to generate {} data.", kind.title()),
                            format!("Section did not finish within {budget:?}"),
                        )
                    }
                };
                (kind, result)
            }
        });

        let mut memo = MemoDocument::new();
        for (kind, result) in join_all(tasks).await {
            memo.insert(kind, result);
        }

        log_outcome(&memo, started);
        memo
    }
}

/// One narrative worker per always-included section, then tax and legal.
pub fn default_workers() -> Vec<Arc<dyn SectionWorker>> {
    let mut workers: Vec<Arc<dyn SectionWorker>> = ALWAYS_INCLUDED
        .iter()
        .filter_map(|&kind| NarrativeWorker::new(kind))
        .map(|w| Arc::new(w) as Arc<dyn SectionWorker>)
        .collect();
    workers.push(Arc::new(TaxWorker));
    workers.push(Arc::new(LegalWorker));
    workers
}

fn missing_worker(kind: SectionKind) -> SectionResult {
    tracing::error!(section = kind.as_str(), "No worker registered for planned section");
    SectionResult::failed(
        ErrorKind::Internal,
        format!("Failed to generate {} data.", kind.title()),
        "No worker is registered for this section",
    )
}

fn panicked(kind: SectionKind, message: &str) -> SectionResult {
    tracing::error!(section = kind.as_str(), panic = message, "Section worker panicked");
    SectionResult::failed(
        ErrorKind::Internal,
        format!("Failed to generate {} data.", kind.title()),
        format!("Worker panicked: {message}"),
    )
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn log_outcome(memo: &MemoDocument, started: Instant) {
    tracing::info!(
        sections = memo.len(),
        failed = memo.failed_count(),
        duration_ms = started.elapsed().as_millis() as u64,
        "Memo assembled"
    );
}

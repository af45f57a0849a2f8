pub mod api;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod pipeline_config;

use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::api::{start_memo_api_server, ApiContext, ServerError};
use crate::config::{AppConfig, ConfigError};
use crate::pipeline::generation::{
    GenerationError, LlmClient, OllamaClient, SchemaConstrainedGenerator,
};
use crate::pipeline::retrieval::{OllamaEmbedder, QdrantRetriever, RetrievalError};
use crate::pipeline::schema::SchemaRegistry;
use crate::pipeline::worker::WorkerContext;
use crate::pipeline::MemoOrchestrator;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Retrieval client setup failed: {0}")]
    Retrieval(#[from] RetrievalError),
    #[error("Generation client setup failed: {0}")]
    Generation(#[from] GenerationError),
    #[error("Failed to start async runtime: {0}")]
    Runtime(std::io::Error),
    #[error(transparent)]
    Server(#[from] ServerError),
}

pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    match start() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            ExitCode::FAILURE
        }
    }
}

fn start() -> Result<(), StartupError> {
    let config = AppConfig::from_env()?;

    // Blocking HTTP clients must be built outside the async runtime.
    let ctx = build_worker_context(&config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(StartupError::Runtime)?;

    // The last handle to the clients is released here, off the runtime.
    let served = runtime.block_on(serve(config, ctx.clone()));
    drop(runtime);
    drop(ctx);
    served
}

/// Build the retrieval and generation clients once and bundle them for the
/// workers. Warns, without failing, when Ollama lacks a configured model.
pub fn build_worker_context(config: &AppConfig) -> Result<WorkerContext, StartupError> {
    let call_timeout_secs = config.generation.call_timeout.as_secs();

    let embedder = OllamaEmbedder::new(
        &config.generation.ollama_host,
        &config.retrieval.embedding_model,
        call_timeout_secs,
    )?;
    let retriever = QdrantRetriever::new(
        &config.retrieval.qdrant_host,
        &config.retrieval.collection,
        config.retrieval.api_key.clone(),
        Arc::new(embedder),
        call_timeout_secs,
    )?;

    let llm = OllamaClient::new(&config.generation.ollama_host, call_timeout_secs)?;
    for model in [&config.generation.model, &config.retrieval.embedding_model] {
        match llm.is_model_available(model) {
            Ok(true) => tracing::info!(model = %model, "Ollama model available"),
            Ok(false) => tracing::warn!(model = %model, "Ollama model not pulled; requests will fail until it is"),
            Err(e) => tracing::warn!(model = %model, error = %e, "Could not check Ollama models"),
        }
    }
    let generator = SchemaConstrainedGenerator::new(llm, &config.generation.model)
        .with_max_attempts(config.generation.max_attempts);

    tracing::info!(
        qdrant = %config.retrieval.qdrant_host,
        collection = %config.retrieval.collection,
        ollama = %config.generation.ollama_host,
        model = %config.generation.model,
        "Pipeline clients ready"
    );

    Ok(WorkerContext {
        retriever: Arc::new(retriever),
        generator: Arc::new(generator),
        schemas: Arc::new(SchemaRegistry::new()),
        settings: config.pipeline.clone(),
    })
}

async fn serve(config: AppConfig, ctx: WorkerContext) -> Result<(), StartupError> {
    let api = ApiContext::new(MemoOrchestrator::new(ctx));
    let server =
        start_memo_api_server(api, config.server.bind, &config.server.cors_origins).await?;
    tracing::info!(addr = %server.session.server_addr, "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    server.stop().await;
    Ok(())
}

mod config;
mod errors;
mod extraction;
mod llm_client;
mod ranking;
mod routes;
mod state;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::extraction::DocumentExtractor;
use crate::llm_client::embeddings::EmbeddingClient;
use crate::llm_client::LlmClient;
use crate::ranking::pipeline::RankingPipeline;
use crate::ranking::providers::LlmSummaryProvider;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Candidate Recommender API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize embedding client
    let embedder = EmbeddingClient::new(
        &config.embedding_api_base,
        config.embedding_api_key.clone(),
        config.embedding_model.clone(),
        config.provider_timeout,
        config.retry_policy(),
    )
    .context("Failed to build embedding client")?;
    info!(
        "Embedding client initialized (model: {}, endpoint: {})",
        embedder.model(),
        config.embedding_api_base
    );

    // Initialize LLM client
    let llm = LlmClient::new(
        &config.summary_api_base,
        config.summary_api_key.clone(),
        config.summary_model.clone(),
        config.provider_timeout,
        config.retry_policy(),
    )
    .context("Failed to build LLM client")?;
    info!("LLM client initialized (model: {})", llm.model());

    let pipeline = RankingPipeline::new(
        Arc::new(embedder),
        Arc::new(LlmSummaryProvider::new(llm, config.summary_timeout)),
        config.provider_concurrency,
    );

    // Build app state
    let state = AppState {
        pipeline: Arc::new(pipeline),
        extractor: Arc::new(DocumentExtractor),
        config: config.clone(),
    };

    let cors = build_cors(&config.allowed_origins)?;

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

/// CORS for the browser UI: the configured origins, any method and header.
fn build_cors(origins: &[String]) -> Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|o| {
            HeaderValue::from_str(o).with_context(|| format!("Invalid CORS origin '{o}'"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any))
}

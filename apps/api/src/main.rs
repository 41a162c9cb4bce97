mod analysis;
mod audit;
mod capability;
mod config;
mod errors;
mod extraction;
mod llm_client;
mod routes;
mod state;
mod text;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::pipeline::{Analyzer, PipelineSettings};
use crate::audit::{build_audit_sink, AuditLogger};
use crate::config::Config;
use crate::extraction::DocumentTextExtractor;
use crate::llm_client::{LlmClient, ModelParams};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume Analyzer API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize completion client
    let llm = LlmClient::new(config.groq_api_key.clone(), config.completion_url.clone())
        .context("Failed to build completion client")?;
    info!("Completion client initialized (model: {})", config.model);

    // Initialize audit sink
    let audit = AuditLogger::new(build_audit_sink(
        config.audit.as_ref(),
        config.deployment_mode,
    )?);

    let settings = PipelineSettings {
        output_mode: config.output_mode,
        params: ModelParams {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        },
        fallback_message: config.declared_fallback(),
    };
    info!(
        "Pipeline: output_mode={:?} deployment_mode={:?} max_pages={:?} char_limit={}",
        settings.output_mode, config.deployment_mode, config.max_pages, config.text_char_limit
    );

    let analyzer = Analyzer::new(
        DocumentTextExtractor::new(config.max_pages, config.text_char_limit),
        Arc::new(llm),
        audit,
        settings,
    );

    // Build app state
    let state = AppState {
        analyzer: Arc::new(analyzer),
    };

    // Build router
    let app = build_router(state, config.max_upload_bytes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

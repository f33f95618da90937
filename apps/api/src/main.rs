use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use coursepath_api::catalog::DepartmentCatalog;
use coursepath_api::config::Config;
use coursepath_api::corpus::DepartmentStore;
use coursepath_api::llm_client::{self, retry, CompletionClient, RetryPolicy};
use coursepath_api::recommendation::RecommendationPipeline;
use coursepath_api::routes::build_router;
use coursepath_api::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CoursePath API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let policy = RetryPolicy::new(config.llm_max_attempts, retry::DEFAULT_BASE_DELAY);
    let client = CompletionClient::anthropic(config.anthropic_api_key.clone(), config.llm_timeout)
        .context("Failed to build the completion client")?
        .with_retry_policy(policy);
    info!(
        "LLM client initialized (model: {}, attempts: {}, timeout: {}s)",
        llm_client::MODEL,
        client.retry_policy().max_attempts,
        config.llm_timeout.as_secs()
    );

    let store = DepartmentStore::new(config.departments_dir.clone());
    info!("Reading department course files from {}", store.dir().display());

    // Department catalog is fixed for the lifetime of the process
    let catalog = DepartmentCatalog::load(&config.catalog_source, &store).await?;
    info!(
        "Department catalog loaded from {:?}: {} departments",
        config.catalog_source,
        catalog.len()
    );

    // Build app state
    let state = AppState {
        pipeline: RecommendationPipeline::new(client, Arc::new(catalog), store),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

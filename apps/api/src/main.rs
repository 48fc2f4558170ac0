mod config;
mod db;
mod errors;
mod generation;
mod llm_client;
mod models;
mod render;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::generation::cache::DEFAULT_CACHE_CAPACITY;
use crate::generation::engine::{EngineSettings, TextEngine};
use crate::llm_client::{GeminiClient, ModelInvoker, OpenAiClient};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.rust_log)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Proposal API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let pool = create_pool(&config.database_url).await?;
    db::init_schema(&pool).await?;

    // Initialize the text generation engine
    let engine = Arc::new(build_engine(&config));
    info!(
        "Text engine initialized (model: {}, stub: {})",
        config.openai_model, config.llm_use_stub
    );

    // Load the proposal template
    let template = Arc::new(render::load_template(config.template_path.as_deref()));

    let state = AppState {
        db: pool,
        engine,
        config: config.clone(),
        template,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Wires the configured providers into a `TextEngine`.
///
/// Without an OpenAI key the primary client still exists but every call will
/// fail with a permission error, so the engine degrades to the secondary
/// provider or the deterministic fallback. Stub mode skips providers entirely.
fn build_engine(config: &Config) -> TextEngine {
    if config.openai_api_key.is_none() && !config.llm_use_stub {
        warn!("OPENAI_API_KEY is not set; generation will rely on fallbacks");
    }

    let primary: Arc<dyn ModelInvoker> = Arc::new(OpenAiClient::new(
        config.openai_api_key.clone().unwrap_or_default(),
        config.llm_request_timeout_secs,
        config.openai_max_tokens,
        config.openai_temperature,
    ));

    let secondary: Option<Arc<dyn ModelInvoker>> = config.google_api_key.clone().map(|key| {
        Arc::new(GeminiClient::new(key, config.llm_request_timeout_secs)) as Arc<dyn ModelInvoker>
    });

    let settings = EngineSettings {
        model: config.openai_model.clone(),
        fallback_model: config.openai_fallback_model.clone(),
        secondary_model: config.gemini_model.clone(),
        max_attempts: config.llm_max_attempts,
        backoff_base: std::time::Duration::from_millis(config.llm_backoff_base_ms),
        use_stub: config.llm_use_stub,
    };

    TextEngine::new(primary, secondary, settings, DEFAULT_CACHE_CAPACITY)
}

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::generation::engine::TextEngine;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Text generation engine: retry/fallback orchestration plus prompt cache.
    pub engine: Arc<TextEngine>,
    pub config: Config,
    /// Loaded proposal template text.
    pub template: Arc<String>,
}

pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::generation::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/proposals/generate",
            post(handlers::handle_generate_proposal),
        )
        .route(
            "/api/v1/proposals/suggestions",
            post(handlers::handle_suggestions),
        )
        .route("/api/v1/proposals/:id", get(handlers::handle_get_version))
        .with_state(state)
}

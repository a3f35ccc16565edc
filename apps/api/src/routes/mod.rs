pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::ranking::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        // Ranking API
        .route("/upload", post(handlers::handle_upload))
        .route("/upload/", post(handlers::handle_upload))
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(state)
}

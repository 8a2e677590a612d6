pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::optimizer::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/optimize", post(handlers::handle_optimize))
        .route(
            "/api/optimize/download",
            post(handlers::handle_optimize_download),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

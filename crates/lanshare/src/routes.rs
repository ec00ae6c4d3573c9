use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;
use crate::handlers;

/// Create file server routes
pub fn file_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Directory listing page
        .route("/", get(handlers::index))
        // Single file
        .route("/download", get(handlers::download))
        .route("/preview", get(handlers::preview))
        // Archives
        .route("/download_selected", post(handlers::download_selected))
        .route("/download_folder", get(handlers::download_folder))
}

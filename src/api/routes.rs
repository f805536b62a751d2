use axum::{routing::get, Router};
use std::path::Path;
use tower_http::services::ServeDir;

use crate::api::{dispatcher, handlers, AppState};

/// Health check, static resources of the default application, and the
/// dispatcher for everything else.
pub fn create_router(resources_dir: impl AsRef<Path>) -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Static files
        .nest_service("/resources", ServeDir::new(resources_dir.as_ref()))
        // Controllers, APIs and views
        .fallback(dispatcher::dispatch)
}

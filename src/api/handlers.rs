use axum::{extract::State, response::Json};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::framework::Framework;

pub type AppState = Arc<Framework>;

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub handlers: usize,
    pub persistence: bool,
}

pub async fn health_check(State(framework): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        handlers: framework.registry.len(),
        persistence: framework.pool().is_some(),
    })
}

/// Structured error payload for non-HTML responses.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub message: String,
    pub http_status: u16,
    pub details: Value,
}

//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::services::gemini::DirectiveSource;
use crate::services::suno::RenderApi;
use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status (e.g., "ok")
    pub status: String,
    /// Module name ("soundflow-engine")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
}

/// GET /health
pub async fn health_check<G, R>(State(state): State<AppState<G, R>>) -> Json<HealthResponse>
where
    G: DirectiveSource + 'static,
    R: RenderApi + 'static,
{
    let uptime = Utc::now().signed_duration_since(state.startup_time);

    Json(HealthResponse {
        status: "ok".to_string(),
        module: "soundflow-engine".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime.num_seconds().max(0) as u64,
    })
}

/// Build health check routes
pub fn health_routes<G, R>() -> Router<AppState<G, R>>
where
    G: DirectiveSource + 'static,
    R: RenderApi + 'static,
{
    Router::new().route("/health", get(health_check))
}

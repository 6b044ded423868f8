//! Demo fan-out endpoints

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::services::demo::{DemoSnapshot, DemoStartError};
use crate::services::gemini::DirectiveSource;
use crate::services::suno::RenderApi;
use crate::AppState;

/// Request body for POST /demo/start
#[derive(Debug, Default, Deserialize)]
pub struct StartDemoRequest {
    /// Overrides the configured taste profile for this fan-out
    pub music_taste: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartDemoResponse {
    pub demo_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct CancelDemoResponse {
    pub cancelled: bool,
}

/// POST /demo/start
///
/// Returns 409 while a fan-out is already in flight.
pub async fn start_demo<G, R>(
    State(state): State<AppState<G, R>>,
    body: Option<Json<StartDemoRequest>>,
) -> ApiResult<Json<StartDemoResponse>>
where
    G: DirectiveSource + 'static,
    R: RenderApi + 'static,
{
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let music_taste = req.music_taste.unwrap_or_else(|| state.music_taste.clone());

    let demo_id = state
        .demo
        .start(music_taste)
        .await
        .map_err(|e: DemoStartError| ApiError::Conflict(e.to_string()))?;

    tracing::info!(%demo_id, "Demo fan-out started via API");
    Ok(Json(StartDemoResponse { demo_id }))
}

/// GET /demo/status
pub async fn demo_status<G, R>(State(state): State<AppState<G, R>>) -> Json<DemoSnapshot>
where
    G: DirectiveSource + 'static,
    R: RenderApi + 'static,
{
    Json(state.demo.snapshot())
}

/// POST /demo/cancel
pub async fn cancel_demo<G, R>(State(state): State<AppState<G, R>>) -> Json<CancelDemoResponse>
where
    G: DirectiveSource + 'static,
    R: RenderApi + 'static,
{
    let cancelled = state.demo.cancel().await;
    Json(CancelDemoResponse { cancelled })
}

/// Build demo routes
pub fn demo_routes<G, R>() -> Router<AppState<G, R>>
where
    G: DirectiveSource + 'static,
    R: RenderApi + 'static,
{
    Router::new()
        .route("/demo/start", post(start_demo))
        .route("/demo/status", get(demo_status))
        .route("/demo/cancel", post(cancel_demo))
}

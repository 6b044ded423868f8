//! Pipeline run endpoints
//!
//! POST /pipeline/start begins a run, cancelling any run in flight.
//! GET /pipeline/status reports the live snapshot. POST /pipeline/cancel
//! winds the active run down and resets to idle.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{GenerationContext, RunSnapshot, StressLevel};
use crate::services::gemini::DirectiveSource;
use crate::services::suno::RenderApi;
use crate::AppState;

fn default_instrumental() -> bool {
    true
}

/// Request body for POST /pipeline/start
#[derive(Debug, Deserialize)]
pub struct StartPipelineRequest {
    /// "high", "moderate" or "low"
    pub stress_level: String,
    pub scene: Option<String>,
    pub narrative: Option<String>,
    pub musical_direction: Option<String>,
    #[serde(default = "default_instrumental")]
    pub instrumental: bool,
    /// Overrides the configured taste profile for this run
    pub music_taste: Option<String>,
    /// Base64-encoded JPEG frame; selects the vision reasoning path
    pub frame_jpeg_base64: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartPipelineResponse {
    pub run_id: Uuid,
    pub phase: String,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
    pub snapshot: RunSnapshot,
}

/// POST /pipeline/start
///
/// Accepted (202): the run continues in the background. A run already in
/// flight is cancelled and superseded.
pub async fn start_pipeline<G, R>(
    State(state): State<AppState<G, R>>,
    Json(req): Json<StartPipelineRequest>,
) -> ApiResult<(StatusCode, Json<StartPipelineResponse>)>
where
    G: DirectiveSource + 'static,
    R: RenderApi + 'static,
{
    let stress: StressLevel = req
        .stress_level
        .parse()
        .map_err(ApiError::BadRequest)?;

    let music_taste = req.music_taste.unwrap_or_else(|| state.music_taste.clone());
    let mut ctx = GenerationContext::new(stress, music_taste, req.instrumental);
    ctx.scene = req.scene;
    ctx.narrative = req.narrative;
    ctx.musical_direction = req.musical_direction;
    ctx.frame_jpeg_base64 = req.frame_jpeg_base64;

    let run_id = state.runs.start(ctx).await;
    tracing::info!(%run_id, stress = %stress, "Pipeline run started via API");
    Ok((
        StatusCode::ACCEPTED,
        Json(StartPipelineResponse {
            run_id,
            phase: "analyzing".to_string(),
        }),
    ))
}

/// GET /pipeline/status
pub async fn pipeline_status<G, R>(
    State(state): State<AppState<G, R>>,
) -> Json<RunSnapshot>
where
    G: DirectiveSource + 'static,
    R: RenderApi + 'static,
{
    Json(state.runs.snapshot())
}

/// POST /pipeline/cancel
pub async fn cancel_pipeline<G, R>(
    State(state): State<AppState<G, R>>,
) -> Json<CancelResponse>
where
    G: DirectiveSource + 'static,
    R: RenderApi + 'static,
{
    let cancelled = state.runs.cancel().await;
    Json(CancelResponse {
        cancelled,
        snapshot: state.runs.snapshot(),
    })
}

/// Build pipeline routes
pub fn pipeline_routes<G, R>() -> Router<AppState<G, R>>
where
    G: DirectiveSource + 'static,
    R: RenderApi + 'static,
{
    Router::new()
        .route("/pipeline/start", post(start_pipeline))
        .route("/pipeline/status", get(pipeline_status))
        .route("/pipeline/cancel", post(cancel_pipeline))
}

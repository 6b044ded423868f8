//! soundflow-engine library interface
//!
//! Exposes the pipeline, demo and API surfaces for integration testing.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use soundflow_common::events::EventBus;

use crate::config::FlowConfig;
use crate::services::demo::{DemoCoordinator, DemoManager};
use crate::services::gemini::{DirectiveSource, GeminiClient};
use crate::services::pipeline::{PipelineOrchestrator, RunManager};
use crate::services::playback::{LogPlayback, SharedPlayback};
use crate::services::poller::PollConfig;
use crate::services::suno::{RenderApi, SunoClient};

/// Application state shared across handlers
///
/// Generic over the reasoning and render seams so tests can wire in
/// scripted clients.
pub struct AppState<G, R> {
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// The single active pipeline run
    pub runs: Arc<RunManager<G, R>>,
    /// The single active demo fan-out
    pub demo: Arc<DemoManager<G, R>>,
    /// Configured taste profile, snapshotted into each run
    pub music_taste: String,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl<G, R> Clone for AppState<G, R> {
    fn clone(&self) -> Self {
        Self {
            event_bus: self.event_bus.clone(),
            runs: Arc::clone(&self.runs),
            demo: Arc::clone(&self.demo),
            music_taste: self.music_taste.clone(),
            startup_time: self.startup_time,
        }
    }
}

impl<G, R> AppState<G, R>
where
    G: DirectiveSource + 'static,
    R: RenderApi + 'static,
{
    /// Wire the pipeline and demo managers around the given clients
    pub fn new(
        llm: Arc<G>,
        render: Arc<R>,
        playback: SharedPlayback,
        poll: PollConfig,
        music_taste: String,
        event_bus: EventBus,
    ) -> Self {
        let orchestrator = PipelineOrchestrator::new(
            Arc::clone(&llm),
            Arc::clone(&render),
            playback,
            poll,
            event_bus.clone(),
        );
        let coordinator = DemoCoordinator::new(llm, render, PollConfig::demo(), event_bus.clone());

        Self {
            event_bus,
            runs: Arc::new(RunManager::new(orchestrator)),
            demo: Arc::new(DemoManager::new(coordinator)),
            music_taste,
            startup_time: Utc::now(),
        }
    }
}

/// Production state backed by the real Gemini and Suno clients
pub type EngineState = AppState<GeminiClient, SunoClient>;

/// Build the production state from resolved configuration
pub fn engine_state(config: &FlowConfig, event_bus: EventBus) -> anyhow::Result<EngineState> {
    let llm = GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        config.gemini_base_url.clone(),
    )
    .map_err(|e| anyhow::anyhow!("Gemini client init failed: {e}"))?;
    let render = SunoClient::new(config.suno_bearer_token.clone(), config.suno_base_url.clone())
        .map_err(|e| anyhow::anyhow!("Suno client init failed: {e}"))?;

    Ok(AppState::new(
        Arc::new(llm),
        Arc::new(render),
        Arc::new(LogPlayback::default()),
        config.poll,
        config.music_taste.clone(),
        event_bus,
    ))
}

/// Build application router
pub fn build_router<G, R>(state: AppState<G, R>) -> Router
where
    G: DirectiveSource + 'static,
    R: RenderApi + 'static,
{
    Router::new()
        .merge(api::pipeline_routes())
        .merge(api::demo_routes())
        .merge(api::health_routes())
        .route("/events", get(api::event_stream))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

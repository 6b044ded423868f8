//! soundflow-engine - Adaptive Music Generation Service
//!
//! Orchestrates the generation pipeline: scene and biometric context in,
//! reasoning directive, render job, polled status, early playback
//! handoff. Integrates with clients via HTTP REST + SSE.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use soundflow_common::events::EventBus;
use soundflow_engine::config::FlowConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "soundflow_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting soundflow-engine (Adaptive Music Generation)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Resolve configuration: ENV -> TOML -> defaults
    let config = FlowConfig::resolve().map_err(|e| anyhow::anyhow!("{e}"))?;
    info!(
        poll_interval_secs = config.poll.interval.as_secs(),
        poll_max_attempts = config.poll.max_attempts,
        "Configuration resolved"
    );

    // Create event bus for SSE broadcasting
    let event_bus = EventBus::new(100);
    info!("Event bus initialized");

    // Create application state
    let state = soundflow_engine::engine_state(&config, event_bus)?;

    // Build router
    let app = soundflow_engine::build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Listening on http://{}", config.bind_addr);
    info!("Health check: http://{}/health", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

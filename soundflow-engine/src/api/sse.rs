//! Server-Sent Events for run and demo progress

use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::services::gemini::DirectiveSource;
use crate::services::suno::RenderApi;
use crate::AppState;

/// GET /events - SSE stream of every pipeline and demo event
///
/// Streams the full event feed: RunStarted, PhaseChanged, DirectiveReady,
/// RenderSubmitted, RenderStatusObserved, PlaybackStarted, RunCompleted,
/// RunFailed, RunCancelled, and the Demo* events.
pub async fn event_stream<G, R>(
    State(state): State<AppState<G, R>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    G: DirectiveSource + 'static,
    R: RenderApi + 'static,
{
    info!("New SSE client connected");

    let mut rx = state.event_bus.subscribe();

    let stream = async_stream::stream! {
        loop {
            tokio::select! {
                // Heartbeat every 15 seconds
                _ = tokio::time::sleep(Duration::from_secs(15)) => {
                    debug!("SSE: Sending heartbeat");
                    yield Ok(Event::default().comment("heartbeat"));
                }

                result = rx.recv() => {
                    match result {
                        Ok(event) => {
                            let event_type = event.event_type();
                            match serde_json::to_string(&event) {
                                Ok(event_json) => {
                                    yield Ok(Event::default()
                                        .event(event_type)
                                        .data(event_json));
                                }
                                Err(e) => {
                                    warn!("SSE: Failed to serialize event {}: {}", event_type, e);
                                }
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                            warn!("SSE: Client lagged, {} events dropped", missed);
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                            break;
                        }
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}

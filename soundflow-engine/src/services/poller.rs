//! Render job polling
//!
//! Turns the render service's pull-based clip status endpoint into a
//! stream of observations. Each tick sleeps first, then fetches. Fetch
//! failures are absorbed and the tick is spent; a terminal observation
//! ends the stream after being yielded; running out of attempts ends the
//! stream with no terminal item, which the orchestrator reads as a
//! timeout. Cancellation wins any race with the sleep.

use futures::Stream;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::services::suno::{FetchError, JobId, RenderApi, RenderStatus};

/// Polling cadence and budget
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollConfig {
    /// Main pipeline cadence: 5 s ticks, 5 minute budget
    pub fn main() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 60,
        }
    }

    /// Demo cadence: faster ticks, 4.5 minute budget
    pub fn demo() -> Self {
        Self {
            interval: Duration::from_secs(3),
            max_attempts: 90,
        }
    }
}

/// Watch a render job until it resolves, the budget runs out, or the
/// token is cancelled
pub fn watch<'a, R: RenderApi>(
    api: &'a R,
    job_id: JobId,
    config: PollConfig,
    cancel: CancellationToken,
) -> impl Stream<Item = RenderStatus> + 'a {
    async_stream::stream! {
        'poll: for attempt in 1..=config.max_attempts {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(job_id = %job_id, attempt, "Poll cancelled");
                    break 'poll;
                }
                _ = tokio::time::sleep(config.interval) => {}
            }

            // The token may have been cancelled in the instant between
            // the sleep resolving and this check.
            if cancel.is_cancelled() {
                tracing::debug!(job_id = %job_id, attempt, "Poll cancelled");
                break 'poll;
            }

            match api.fetch_status(&job_id).await {
                Ok(status) => {
                    // A fetch that resolves after cancellation must not
                    // surface its observation.
                    if cancel.is_cancelled() {
                        tracing::debug!(job_id = %job_id, attempt, "Discarding post-cancel observation");
                        break 'poll;
                    }
                    let terminal = status.is_terminal();
                    yield status;
                    if terminal {
                        break 'poll;
                    }
                }
                Err(FetchError::Transient(reason)) => {
                    tracing::debug!(job_id = %job_id, attempt, %reason, "Transient poll failure");
                }
                Err(FetchError::Invalid) => {
                    tracing::warn!(job_id = %job_id, attempt, "Unparseable clip status, continuing");
                }
            }
        }
    }
}

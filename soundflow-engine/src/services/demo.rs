//! Demo fan-out
//!
//! Generates all three scripted scenarios concurrently and collects
//! their tracks without touching the player. Scenarios are independent:
//! one failing leaves the others running, and the fan-out completes when
//! every scenario has joined.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use soundflow_common::events::{EventBus, FlowEvent};

use crate::models::{DemoScenario, RunSnapshot, TrackInfo, DEMO_SCENARIOS};
use crate::services::gemini::DirectiveSource;
use crate::services::pipeline::{PipelineOrchestrator, RunOutcome};
use crate::services::playback::NullPlayback;
use crate::services::poller::PollConfig;
use crate::services::suno::RenderApi;

/// Where one demo scenario is in its life
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioState {
    Generating,
    Ready,
    Failed,
}

/// Per-scenario progress and result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioStatus {
    pub scenario_id: String,
    pub title: String,
    pub state: ScenarioState,
    pub track: Option<TrackInfo>,
    pub error: Option<String>,
}

/// Point-in-time view of the demo fan-out
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoSnapshot {
    pub demo_id: Option<Uuid>,
    pub running: bool,
    pub scenarios: Vec<ScenarioStatus>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl DemoSnapshot {
    pub fn idle() -> Self {
        Self {
            demo_id: None,
            running: false,
            scenarios: Vec::new(),
            started_at: None,
            ended_at: None,
        }
    }

    fn started(demo_id: Uuid) -> Self {
        Self {
            demo_id: Some(demo_id),
            running: true,
            scenarios: DEMO_SCENARIOS
                .iter()
                .map(|s| ScenarioStatus {
                    scenario_id: s.id.to_string(),
                    title: s.title.to_string(),
                    state: ScenarioState::Generating,
                    track: None,
                    error: None,
                })
                .collect(),
            started_at: Some(Utc::now()),
            ended_at: None,
        }
    }

    pub fn ready_count(&self) -> usize {
        self.scenarios
            .iter()
            .filter(|s| s.state == ScenarioState::Ready)
            .count()
    }
}

#[derive(Debug, Error)]
pub enum DemoStartError {
    #[error("A demo is already running")]
    AlreadyRunning,
}

/// Runs the three demo scenarios concurrently
pub struct DemoCoordinator<G, R> {
    llm: Arc<G>,
    render: Arc<R>,
    poll: PollConfig,
    events: EventBus,
}

impl<G, R> Clone for DemoCoordinator<G, R> {
    fn clone(&self) -> Self {
        Self {
            llm: Arc::clone(&self.llm),
            render: Arc::clone(&self.render),
            poll: self.poll,
            events: self.events.clone(),
        }
    }
}

impl<G, R> DemoCoordinator<G, R>
where
    G: DirectiveSource + 'static,
    R: RenderApi + 'static,
{
    pub fn new(llm: Arc<G>, render: Arc<R>, poll: PollConfig, events: EventBus) -> Self {
        Self {
            llm,
            render,
            poll,
            events,
        }
    }

    /// Generate every scenario, updating `snapshot` as each one joins
    pub async fn generate_all(
        &self,
        demo_id: Uuid,
        music_taste: &str,
        cancel: CancellationToken,
        snapshot: &watch::Sender<DemoSnapshot>,
    ) {
        snapshot.send_replace(DemoSnapshot::started(demo_id));
        self.events.emit_lossy(FlowEvent::DemoStarted {
            demo_id,
            scenario_count: DEMO_SCENARIOS.len(),
            timestamp: Utc::now(),
        });

        let [a, b, c] = &DEMO_SCENARIOS;
        tokio::join!(
            self.run_scenario(demo_id, a, music_taste, &cancel, snapshot),
            self.run_scenario(demo_id, b, music_taste, &cancel, snapshot),
            self.run_scenario(demo_id, c, music_taste, &cancel, snapshot),
        );

        let ready = snapshot.borrow().ready_count();
        snapshot.send_modify(|s| {
            s.running = false;
            s.ended_at = Some(Utc::now());
        });
        self.events.emit_lossy(FlowEvent::DemoCompleted {
            demo_id,
            ready_count: ready,
            timestamp: Utc::now(),
        });
        tracing::info!(%demo_id, ready, "Demo fan-out joined");
    }

    async fn run_scenario(
        &self,
        demo_id: Uuid,
        scenario: &DemoScenario,
        music_taste: &str,
        cancel: &CancellationToken,
        snapshot: &watch::Sender<DemoSnapshot>,
    ) {
        let orchestrator = PipelineOrchestrator::new(
            Arc::clone(&self.llm),
            Arc::clone(&self.render),
            Arc::new(NullPlayback),
            self.poll,
            self.events.clone(),
        );

        // Each scenario run publishes into a throwaway channel; demo
        // progress is tracked per scenario, not per pipeline phase.
        let started = std::time::Instant::now();
        let (run_tx, _run_rx) = watch::channel(RunSnapshot::idle());
        let outcome = orchestrator
            .run(
                Uuid::new_v4(),
                scenario.context(music_taste),
                cancel.child_token(),
                &run_tx,
            )
            .await;

        tracing::info!(
            scenario = scenario.id,
            elapsed_secs = started.elapsed().as_secs(),
            "Demo scenario joined"
        );

        let (state, track, error) = match outcome {
            RunOutcome::Complete(track) => (ScenarioState::Ready, Some(track), None),
            RunOutcome::Failed(reason) => (ScenarioState::Failed, None, Some(reason)),
            RunOutcome::Cancelled => {
                (ScenarioState::Failed, None, Some("cancelled".to_string()))
            }
        };

        self.events.emit_lossy(FlowEvent::DemoTrackReady {
            demo_id,
            scenario_id: scenario.id.to_string(),
            audio_url: track.as_ref().map(|t| t.audio_url.clone()),
            timestamp: Utc::now(),
        });

        snapshot.send_modify(|s| {
            if let Some(entry) = s
                .scenarios
                .iter_mut()
                .find(|e| e.scenario_id == scenario.id)
            {
                entry.state = state;
                entry.track = track;
                entry.error = error;
            }
        });
    }
}

struct ActiveDemo {
    demo_id: Uuid,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owns the single active demo fan-out
pub struct DemoManager<G, R> {
    coordinator: DemoCoordinator<G, R>,
    snapshot_tx: Arc<watch::Sender<DemoSnapshot>>,
    active: Mutex<Option<ActiveDemo>>,
}

impl<G, R> DemoManager<G, R>
where
    G: DirectiveSource + 'static,
    R: RenderApi + 'static,
{
    pub fn new(coordinator: DemoCoordinator<G, R>) -> Self {
        let (snapshot_tx, _) = watch::channel(DemoSnapshot::idle());
        Self {
            coordinator,
            snapshot_tx: Arc::new(snapshot_tx),
            active: Mutex::new(None),
        }
    }

    /// Start the fan-out; rejected while one is already in flight
    pub async fn start(&self, music_taste: String) -> Result<Uuid, DemoStartError> {
        let mut active = self.active.lock().await;
        if let Some(demo) = active.as_ref() {
            if !demo.handle.is_finished() {
                return Err(DemoStartError::AlreadyRunning);
            }
        }

        let demo_id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        let coordinator = self.coordinator.clone();
        let snapshot_tx = Arc::clone(&self.snapshot_tx);
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            coordinator
                .generate_all(demo_id, &music_taste, token, &snapshot_tx)
                .await;
        });

        *active = Some(ActiveDemo {
            demo_id,
            cancel,
            handle,
        });
        Ok(demo_id)
    }

    /// Cancel the active fan-out, if any
    pub async fn cancel(&self) -> bool {
        let mut active = self.active.lock().await;
        match active.take() {
            Some(demo) => {
                demo.cancel.cancel();
                if let Err(e) = demo.handle.await {
                    tracing::warn!(demo_id = %demo.demo_id, error = %e, "Demo task panicked");
                }
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self) -> DemoSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<DemoSnapshot> {
        self.snapshot_tx.subscribe()
    }
}

//! Generation run orchestration
//!
//! `PipelineOrchestrator::run` drives a single run from context to
//! outcome: reasoning, render submission, polling, early playback
//! handoff, completion. `RunManager` owns the one active run and
//! implements start-cancels-previous semantics.
//!
//! Cancellation is cooperative. The token is checked between stages and
//! raced against the poll sleep; an in-flight network call is never
//! aborted mid-request, its result is simply discarded.

use chrono::Utc;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use soundflow_common::events::{EventBus, FlowEvent};

use crate::models::{GenerationContext, RunPhase, RunSnapshot, TrackInfo};
use crate::services::gemini::DirectiveSource;
use crate::services::playback::SharedPlayback;
use crate::services::poller::{self, PollConfig};
use crate::services::suno::{RenderApi, RenderState};

/// How a run ended
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Complete(TrackInfo),
    Failed(String),
    Cancelled,
}

/// Drives one generation run end to end
pub struct PipelineOrchestrator<G, R> {
    llm: Arc<G>,
    render: Arc<R>,
    playback: SharedPlayback,
    poll: PollConfig,
    events: EventBus,
}

// Manual impl: the service handles are Arcs, G and R need not be Clone.
impl<G, R> Clone for PipelineOrchestrator<G, R> {
    fn clone(&self) -> Self {
        Self {
            llm: Arc::clone(&self.llm),
            render: Arc::clone(&self.render),
            playback: Arc::clone(&self.playback),
            poll: self.poll,
            events: self.events.clone(),
        }
    }
}

impl<G, R> PipelineOrchestrator<G, R>
where
    G: DirectiveSource,
    R: RenderApi,
{
    pub fn new(
        llm: Arc<G>,
        render: Arc<R>,
        playback: SharedPlayback,
        poll: PollConfig,
        events: EventBus,
    ) -> Self {
        Self {
            llm,
            render,
            playback,
            poll,
            events,
        }
    }

    /// Run the full pipeline for one context
    ///
    /// Publishes progress through `snapshot` and the event bus. Always
    /// returns an outcome; errors end the run rather than propagate.
    pub async fn run(
        &self,
        run_id: Uuid,
        ctx: GenerationContext,
        cancel: CancellationToken,
        snapshot: &watch::Sender<RunSnapshot>,
    ) -> RunOutcome {
        snapshot.send_replace(RunSnapshot::started(run_id));
        self.events.emit_lossy(FlowEvent::RunStarted {
            run_id,
            stress_level: ctx.stress.to_string(),
            instrumental: ctx.instrumental,
            timestamp: Utc::now(),
        });
        self.emit_phase(run_id, &RunPhase::Analyzing);

        if cancel.is_cancelled() {
            return self.finish_cancelled(run_id, snapshot, false);
        }

        let directive = match self.llm.generate(&ctx).await {
            Ok(directive) => directive,
            Err(e) => {
                return self.finish_failed(run_id, snapshot, false, format!("reasoning failed: {e}"))
            }
        };
        if cancel.is_cancelled() {
            return self.finish_cancelled(run_id, snapshot, false);
        }

        self.events.emit_lossy(FlowEvent::DirectiveReady {
            run_id,
            activity: directive.activity.clone(),
            target_bpm: directive.target_bpm,
            energy: directive.energy.clone(),
            mood: directive.mood.clone(),
            timestamp: Utc::now(),
        });
        snapshot.send_modify(|s| {
            s.scene_description = Some(directive.scene_description.clone());
            s.reasoning = Some(directive.reasoning.clone());
            s.render_prompt = Some(directive.render_prompt.clone());
            s.set_phase(RunPhase::Rendering);
        });
        self.emit_phase(run_id, &RunPhase::Rendering);

        let job_id = match self.render.submit(&directive, ctx.instrumental).await {
            Ok(job_id) => job_id,
            Err(e) => {
                return self.finish_failed(run_id, snapshot, false, format!("render submission failed: {e}"))
            }
        };
        if cancel.is_cancelled() {
            return self.finish_cancelled(run_id, snapshot, false);
        }
        self.events.emit_lossy(FlowEvent::RenderSubmitted {
            run_id,
            job_id: job_id.to_string(),
            timestamp: Utc::now(),
        });

        let mut playback_started = false;
        let mut track: Option<TrackInfo> = None;
        let mut terminal: Option<RenderState> = None;
        let mut observation = 0u32;

        {
            let stream = poller::watch(
                self.render.as_ref(),
                job_id.clone(),
                self.poll,
                cancel.clone(),
            );
            futures::pin_mut!(stream);

            while let Some(status) = stream.next().await {
                if cancel.is_cancelled() {
                    break;
                }
                observation += 1;
                self.events.emit_lossy(FlowEvent::RenderStatusObserved {
                    run_id,
                    job_id: job_id.to_string(),
                    status: status.state.as_str().to_string(),
                    has_audio_url: status.playable_url().is_some(),
                    observation,
                    timestamp: Utc::now(),
                });

                if let Some(url) = status.playable_url() {
                    if !playback_started {
                        self.playback.start(url);
                        playback_started = true;
                        let new_track = TrackInfo {
                            audio_url: url.to_string(),
                            title: status.title.clone(),
                            image_url: status.image_url.clone(),
                            bpm: Some(directive.target_bpm),
                            mood: Some(directive.mood.clone()),
                            energy: Some(directive.energy.clone()),
                        };
                        track = Some(new_track.clone());
                        snapshot.send_modify(|s| {
                            s.track = Some(new_track);
                            s.set_phase(RunPhase::Streaming);
                        });
                        self.events.emit_lossy(FlowEvent::PlaybackStarted {
                            run_id,
                            audio_url: url.to_string(),
                            timestamp: Utc::now(),
                        });
                        self.emit_phase(run_id, &RunPhase::Streaming);
                    } else if let Some(t) = track.as_mut() {
                        // Title and artwork often arrive only with `complete`.
                        if t.title.is_none() {
                            t.title = status.title.clone();
                        }
                        if t.image_url.is_none() {
                            t.image_url = status.image_url.clone();
                        }
                        let enriched = t.clone();
                        snapshot.send_modify(|s| s.track = Some(enriched));
                    }
                }

                if status.is_terminal() {
                    terminal = Some(status.state);
                }
            }
        }

        if cancel.is_cancelled() {
            return self.finish_cancelled(run_id, snapshot, playback_started);
        }

        if matches!(terminal, Some(RenderState::Error)) {
            return self.finish_failed(
                run_id,
                snapshot,
                playback_started,
                "render service reported an error".to_string(),
            );
        }

        match track {
            Some(track) => {
                if terminal.is_none() {
                    tracing::warn!(
                        %run_id,
                        "Poll budget exhausted after handoff, completing with the streaming track"
                    );
                }
                self.finish_complete(run_id, snapshot, track)
            }
            None => {
                let reason = if terminal.is_some() {
                    "render completed without an audio URL"
                } else {
                    "render timed out"
                };
                self.finish_failed(run_id, snapshot, false, reason.to_string())
            }
        }
    }

    fn emit_phase(&self, run_id: Uuid, phase: &RunPhase) {
        self.events.emit_lossy(FlowEvent::PhaseChanged {
            run_id,
            phase: phase.name().to_string(),
            step: phase.step().name().to_string(),
            timestamp: Utc::now(),
        });
    }

    fn finish_complete(
        &self,
        run_id: Uuid,
        snapshot: &watch::Sender<RunSnapshot>,
        track: TrackInfo,
    ) -> RunOutcome {
        snapshot.send_modify(|s| {
            s.track = Some(track.clone());
            s.set_phase(RunPhase::Complete);
        });
        self.emit_phase(run_id, &RunPhase::Complete);
        self.events.emit_lossy(FlowEvent::RunCompleted {
            run_id,
            audio_url: Some(track.audio_url.clone()),
            title: track.title.clone(),
            timestamp: Utc::now(),
        });
        tracing::info!(%run_id, audio_url = %track.audio_url, "Run complete");
        RunOutcome::Complete(track)
    }

    fn finish_failed(
        &self,
        run_id: Uuid,
        snapshot: &watch::Sender<RunSnapshot>,
        playback_started: bool,
        reason: String,
    ) -> RunOutcome {
        if playback_started {
            self.playback.stop();
        }
        let phase = RunPhase::Failed {
            reason: reason.clone(),
        };
        snapshot.send_modify(|s| s.set_phase(phase.clone()));
        self.emit_phase(run_id, &phase);
        self.events.emit_lossy(FlowEvent::RunFailed {
            run_id,
            reason: reason.clone(),
            timestamp: Utc::now(),
        });
        tracing::warn!(%run_id, %reason, "Run failed");
        RunOutcome::Failed(reason)
    }

    fn finish_cancelled(
        &self,
        run_id: Uuid,
        snapshot: &watch::Sender<RunSnapshot>,
        playback_started: bool,
    ) -> RunOutcome {
        if playback_started {
            self.playback.stop();
        }
        snapshot.send_replace(RunSnapshot::idle());
        self.events.emit_lossy(FlowEvent::RunCancelled {
            run_id,
            timestamp: Utc::now(),
        });
        tracing::info!(%run_id, "Run cancelled");
        RunOutcome::Cancelled
    }
}

struct ActiveRun {
    run_id: Uuid,
    cancel: CancellationToken,
    handle: JoinHandle<RunOutcome>,
}

/// Owns the single active run
///
/// Starting a new run cancels and joins the previous one before the new
/// one is spawned, so snapshot writes from a superseded run can never
/// land after its replacement starts.
pub struct RunManager<G, R> {
    orchestrator: PipelineOrchestrator<G, R>,
    snapshot_tx: Arc<watch::Sender<RunSnapshot>>,
    active: Mutex<Option<ActiveRun>>,
}

impl<G, R> RunManager<G, R>
where
    G: DirectiveSource + 'static,
    R: RenderApi + 'static,
{
    pub fn new(orchestrator: PipelineOrchestrator<G, R>) -> Self {
        let (snapshot_tx, _) = watch::channel(RunSnapshot::idle());
        Self {
            orchestrator,
            snapshot_tx: Arc::new(snapshot_tx),
            active: Mutex::new(None),
        }
    }

    /// Start a run, cancelling any run already in flight
    pub async fn start(&self, ctx: GenerationContext) -> Uuid {
        let mut active = self.active.lock().await;
        if let Some(prev) = active.take() {
            tracing::info!(run_id = %prev.run_id, "Superseding active run");
            prev.cancel.cancel();
            if let Err(e) = prev.handle.await {
                tracing::warn!(run_id = %prev.run_id, error = %e, "Superseded run panicked");
            }
        }

        let run_id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        let orchestrator = self.orchestrator.clone();
        let snapshot_tx = Arc::clone(&self.snapshot_tx);
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            orchestrator.run(run_id, ctx, token, &snapshot_tx).await
        });

        *active = Some(ActiveRun {
            run_id,
            cancel,
            handle,
        });
        run_id
    }

    /// Cancel the active run, if any
    ///
    /// Returns `true` if a run was cancelled. Waits for the run to wind
    /// down, so the snapshot is back to idle on return.
    pub async fn cancel(&self) -> bool {
        let mut active = self.active.lock().await;
        match active.take() {
            Some(run) => {
                run.cancel.cancel();
                match run.handle.await {
                    Ok(outcome) => {
                        tracing::info!(run_id = %run.run_id, ?outcome, "Active run wound down")
                    }
                    Err(e) => {
                        tracing::warn!(run_id = %run.run_id, error = %e, "Cancelled run panicked")
                    }
                }
                true
            }
            None => false,
        }
    }

    /// Current snapshot of the active (or last) run
    pub fn snapshot(&self) -> RunSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Subscribe to snapshot updates
    pub fn watch(&self) -> watch::Receiver<RunSnapshot> {
        self.snapshot_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StressLevel;
    use crate::services::playback::NullPlayback;
    use crate::services::suno::{FetchError, JobId, RenderStatus};
    use crate::services::test_support::{
        complete, queued, streaming, RecordingPlayback, ScriptedLlm, ScriptedRender,
    };
    use std::time::Duration;

    fn fast_poll() -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(5),
            max_attempts: 60,
        }
    }

    fn ctx() -> GenerationContext {
        GenerationContext::new(StressLevel::High, "Genres: rock".to_string(), false)
    }

    fn orchestrator(
        llm: Arc<ScriptedLlm>,
        render: Arc<ScriptedRender>,
        playback: SharedPlayback,
        poll: PollConfig,
    ) -> PipelineOrchestrator<ScriptedLlm, ScriptedRender> {
        PipelineOrchestrator::new(llm, render, playback, poll, EventBus::new(64))
    }

    fn error_status(job: &str) -> RenderStatus {
        RenderStatus {
            job_id: JobId(job.to_string()),
            state: RenderState::Error,
            audio_url: None,
            title: None,
            image_url: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn run_streams_early_and_completes() {
        let llm = Arc::new(ScriptedLlm::with_directive());
        let render = Arc::new(ScriptedRender::new("job-1"));
        for _ in 0..3 {
            render.queue_fetch(Ok(queued("job-1")));
        }
        render.queue_fetch(Ok(streaming("job-1", "https://x/a.mp3")));
        for _ in 0..4 {
            render.queue_fetch(Ok(streaming("job-1", "https://x/a.mp3")));
        }
        render.queue_fetch(Ok(complete("job-1", "https://x/a.mp3")));
        let playback = Arc::new(RecordingPlayback::new());

        let orch = orchestrator(
            Arc::clone(&llm),
            Arc::clone(&render),
            playback.clone(),
            fast_poll(),
        );
        let (tx, _rx) = watch::channel(RunSnapshot::idle());
        let outcome = orch
            .run(Uuid::new_v4(), ctx(), CancellationToken::new(), &tx)
            .await;

        match outcome {
            RunOutcome::Complete(track) => {
                assert_eq!(track.audio_url, "https://x/a.mp3");
                assert_eq!(track.title.as_deref(), Some("Match Point"));
                assert_eq!(track.bpm, Some(128));
            }
            other => panic!("expected Complete, got {other:?}"),
        }
        assert_eq!(llm.calls(), 1);
        assert_eq!(render.submit_calls(), 1);
        assert_eq!(render.fetch_calls(), 9);
        // Handoff exactly once, no stop on success.
        assert_eq!(playback.calls(), vec!["start:https://x/a.mp3"]);
        assert_eq!(tx.borrow().phase, RunPhase::Complete);
        assert!(tx.borrow().track.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn reasoning_failure_fails_before_submission() {
        let llm = Arc::new(ScriptedLlm::new());
        let render = Arc::new(ScriptedRender::new("job-1"));
        let playback = Arc::new(RecordingPlayback::new());

        let orch = orchestrator(
            Arc::clone(&llm),
            Arc::clone(&render),
            playback.clone(),
            fast_poll(),
        );
        let (tx, _rx) = watch::channel(RunSnapshot::idle());
        let outcome = orch
            .run(Uuid::new_v4(), ctx(), CancellationToken::new(), &tx)
            .await;

        assert!(matches!(outcome, RunOutcome::Failed(_)));
        assert_eq!(render.submit_calls(), 0);
        assert!(playback.calls().is_empty());
        assert!(matches!(tx.borrow().phase, RunPhase::Failed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn render_error_without_url_fails_silently_on_playback() {
        let llm = Arc::new(ScriptedLlm::with_directive());
        let render = Arc::new(ScriptedRender::new("job-1"));
        render.queue_fetch(Ok(queued("job-1")));
        render.queue_fetch(Ok(error_status("job-1")));
        let playback = Arc::new(RecordingPlayback::new());

        let orch = orchestrator(
            Arc::clone(&llm),
            Arc::clone(&render),
            playback.clone(),
            fast_poll(),
        );
        let (tx, _rx) = watch::channel(RunSnapshot::idle());
        let outcome = orch
            .run(Uuid::new_v4(), ctx(), CancellationToken::new(), &tx)
            .await;

        match outcome {
            RunOutcome::Failed(reason) => assert!(reason.contains("error")),
            other => panic!("expected Failed, got {other:?}"),
        }
        assert!(playback.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn render_error_after_handoff_stops_playback() {
        let llm = Arc::new(ScriptedLlm::with_directive());
        let render = Arc::new(ScriptedRender::new("job-1"));
        render.queue_fetch(Ok(streaming("job-1", "https://x/a.mp3")));
        render.queue_fetch(Ok(error_status("job-1")));
        let playback = Arc::new(RecordingPlayback::new());

        let orch = orchestrator(
            Arc::clone(&llm),
            Arc::clone(&render),
            playback.clone(),
            fast_poll(),
        );
        let (tx, _rx) = watch::channel(RunSnapshot::idle());
        let outcome = orch
            .run(Uuid::new_v4(), ctx(), CancellationToken::new(), &tx)
            .await;

        assert!(matches!(outcome, RunOutcome::Failed(_)));
        assert_eq!(
            playback.calls(),
            vec!["start:https://x/a.mp3".to_string(), "stop".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn poll_timeout_without_url_is_a_failure() {
        let llm = Arc::new(ScriptedLlm::with_directive());
        let render = Arc::new(ScriptedRender::new("job-1"));
        let playback = Arc::new(RecordingPlayback::new());

        let orch = orchestrator(
            Arc::clone(&llm),
            Arc::clone(&render),
            playback.clone(),
            PollConfig {
                interval: Duration::from_secs(5),
                max_attempts: 3,
            },
        );
        let (tx, _rx) = watch::channel(RunSnapshot::idle());
        let outcome = orch
            .run(Uuid::new_v4(), ctx(), CancellationToken::new(), &tx)
            .await;

        match outcome {
            RunOutcome::Failed(reason) => assert!(reason.contains("timed out")),
            other => panic!("expected Failed, got {other:?}"),
        }
        assert_eq!(render.fetch_calls(), 3);
        assert!(playback.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn poll_timeout_after_handoff_still_completes() {
        let llm = Arc::new(ScriptedLlm::with_directive());
        let render = Arc::new(ScriptedRender::new("job-1"));
        render.queue_fetch(Ok(streaming("job-1", "https://x/a.mp3")));
        let playback = Arc::new(RecordingPlayback::new());

        let orch = orchestrator(
            Arc::clone(&llm),
            Arc::clone(&render),
            playback.clone(),
            PollConfig {
                interval: Duration::from_secs(5),
                max_attempts: 4,
            },
        );
        let (tx, _rx) = watch::channel(RunSnapshot::idle());
        let outcome = orch
            .run(Uuid::new_v4(), ctx(), CancellationToken::new(), &tx)
            .await;

        assert!(matches!(outcome, RunOutcome::Complete(_)));
        assert_eq!(playback.start_count(), 1);
        assert!(!playback.calls().contains(&"stop".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_reasoning_touches_nothing() {
        let llm = Arc::new(ScriptedLlm::with_directive());
        let render = Arc::new(ScriptedRender::new("job-1"));
        let playback = Arc::new(RecordingPlayback::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let orch = orchestrator(
            Arc::clone(&llm),
            Arc::clone(&render),
            playback.clone(),
            fast_poll(),
        );
        let (tx, _rx) = watch::channel(RunSnapshot::idle());
        let outcome = orch.run(Uuid::new_v4(), ctx(), cancel, &tx).await;

        assert_eq!(outcome, RunOutcome::Cancelled);
        assert_eq!(llm.calls(), 0);
        assert_eq!(render.submit_calls(), 0);
        assert!(playback.calls().is_empty());
        assert_eq!(tx.borrow().phase, RunPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn render_rejection_fails_without_polling() {
        let llm = Arc::new(ScriptedLlm::with_directive());
        let render = Arc::new(ScriptedRender::new("job-1"));
        render.queue_submit(Err(crate::services::suno::RenderError::Rejected(
            "quota exceeded".into(),
        )));
        let playback = Arc::new(RecordingPlayback::new());

        let orch = orchestrator(
            Arc::clone(&llm),
            Arc::clone(&render),
            playback.clone(),
            fast_poll(),
        );
        let (tx, _rx) = watch::channel(RunSnapshot::idle());
        let outcome = orch
            .run(Uuid::new_v4(), ctx(), CancellationToken::new(), &tx)
            .await;

        match outcome {
            RunOutcome::Failed(reason) => assert!(reason.contains("quota exceeded")),
            other => panic!("expected Failed, got {other:?}"),
        }
        assert_eq!(render.submit_calls(), 1);
        assert_eq!(render.fetch_calls(), 0);
        assert!(playback.calls().is_empty());
        assert!(matches!(tx.borrow().phase, RunPhase::Failed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_racing_fetch_never_starts_playback() {
        use crate::services::test_support::CancellingRender;

        let llm = Arc::new(ScriptedLlm::with_directive());
        let cancel = CancellationToken::new();
        // The fetch itself cancels the run before replying with a
        // playable URL, like a user cancel landing mid-request.
        let render = Arc::new(CancellingRender::new("job-1", cancel.clone()));
        render.queue_fetch(Ok(streaming("job-1", "https://x/late.mp3")));
        let playback = Arc::new(RecordingPlayback::new());

        let orch = PipelineOrchestrator::new(
            Arc::clone(&llm),
            Arc::clone(&render),
            playback.clone(),
            fast_poll(),
            EventBus::new(64),
        );
        let (tx, _rx) = watch::channel(RunSnapshot::idle());
        let outcome = orch.run(Uuid::new_v4(), ctx(), cancel, &tx).await;

        assert_eq!(outcome, RunOutcome::Cancelled);
        assert!(playback.calls().is_empty());
        assert_eq!(tx.borrow().phase, RunPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_mid_poll_stops_started_playback() {
        let llm = Arc::new(ScriptedLlm::with_directive());
        let render = Arc::new(ScriptedRender::new("job-1"));
        render.queue_fetch(Ok(streaming("job-1", "https://x/a.mp3")));
        let playback = Arc::new(RecordingPlayback::new());
        let cancel = CancellationToken::new();

        let orch = orchestrator(
            Arc::clone(&llm),
            Arc::clone(&render),
            playback.clone(),
            fast_poll(),
        );
        let (tx, _rx) = watch::channel(RunSnapshot::idle());
        let run = tokio::spawn({
            let cancel = cancel.clone();
            async move { orch.run(Uuid::new_v4(), ctx(), cancel, &tx).await }
        });

        // Let the run reach the streaming phase, then cancel it.
        while playback.start_count() == 0 {
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        cancel.cancel();

        let outcome = run.await.unwrap();
        assert_eq!(outcome, RunOutcome::Cancelled);
        assert_eq!(playback.calls().last().map(String::as_str), Some("stop"));
    }

    #[tokio::test(start_paused = true)]
    async fn events_follow_the_run() {
        let llm = Arc::new(ScriptedLlm::with_directive());
        let render = Arc::new(ScriptedRender::new("job-1"));
        render.queue_fetch(Ok(streaming("job-1", "https://x/a.mp3")));
        render.queue_fetch(Ok(complete("job-1", "https://x/a.mp3")));

        let events = EventBus::new(64);
        let mut rx = events.subscribe();
        let orch = PipelineOrchestrator::new(
            Arc::clone(&llm),
            Arc::clone(&render),
            Arc::new(NullPlayback),
            fast_poll(),
            events,
        );
        let (tx, _watch_rx) = watch::channel(RunSnapshot::idle());
        let outcome = orch
            .run(Uuid::new_v4(), ctx(), CancellationToken::new(), &tx)
            .await;
        assert!(matches!(outcome, RunOutcome::Complete(_)));

        let mut names = Vec::new();
        while let Ok(event) = rx.try_recv() {
            names.push(event.event_type());
        }
        let ordered = [
            "RunStarted",
            "DirectiveReady",
            "RenderSubmitted",
            "PlaybackStarted",
            "RunCompleted",
        ];
        let mut last = 0;
        for name in ordered {
            let pos = names
                .iter()
                .position(|n| *n == name)
                .unwrap_or_else(|| panic!("missing event {name} in {names:?}"));
            assert!(pos >= last, "{name} out of order in {names:?}");
            last = pos;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn manager_start_supersedes_active_run() {
        let llm = Arc::new(ScriptedLlm::new());
        llm.queue(Ok(crate::services::test_support::directive()));
        llm.queue(Ok(crate::services::test_support::directive()));
        let render = Arc::new(ScriptedRender::new("job-1"));
        // First run never resolves on its own; second completes fast.
        render.queue_fetch(Ok(queued("job-1")));
        let playback = Arc::new(RecordingPlayback::new());

        let manager = RunManager::new(orchestrator(
            Arc::clone(&llm),
            Arc::clone(&render),
            playback.clone(),
            fast_poll(),
        ));

        let first = manager.start(ctx()).await;
        tokio::time::sleep(Duration::from_secs(7)).await;

        render.queue_fetch(Ok(complete("job-2", "https://x/b.mp3")));
        let second = manager.start(ctx()).await;
        assert_ne!(first, second);

        // Wait for the second run to finish.
        let mut rx = manager.watch();
        while !manager.snapshot().phase.is_terminal() {
            rx.changed().await.unwrap();
        }

        let snapshot = manager.snapshot();
        assert_eq!(snapshot.run_id, Some(second));
        assert_eq!(snapshot.phase, RunPhase::Complete);
        // Only the second run reached playback.
        assert_eq!(playback.start_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn manager_cancel_resets_to_idle() {
        let llm = Arc::new(ScriptedLlm::with_directive());
        let render = Arc::new(ScriptedRender::new("job-1"));
        let playback = Arc::new(RecordingPlayback::new());

        let manager = RunManager::new(orchestrator(
            Arc::clone(&llm),
            Arc::clone(&render),
            playback.clone(),
            fast_poll(),
        ));

        assert!(!manager.cancel().await);

        manager.start(ctx()).await;
        tokio::time::sleep(Duration::from_secs(7)).await;
        assert!(manager.cancel().await);

        let snapshot = manager.snapshot();
        assert_eq!(snapshot.phase, RunPhase::Idle);
        assert_eq!(snapshot.run_id, None);
        assert!(playback.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn transient_fetch_failures_do_not_fail_the_run() {
        let llm = Arc::new(ScriptedLlm::with_directive());
        let render = Arc::new(ScriptedRender::new("job-1"));
        render.queue_fetch(Err(FetchError::Transient("gateway timeout".into())));
        render.queue_fetch(Err(FetchError::Invalid));
        render.queue_fetch(Ok(complete("job-1", "https://x/a.mp3")));
        let playback = Arc::new(RecordingPlayback::new());

        let orch = orchestrator(
            Arc::clone(&llm),
            Arc::clone(&render),
            playback.clone(),
            fast_poll(),
        );
        let (tx, _rx) = watch::channel(RunSnapshot::idle());
        let outcome = orch
            .run(Uuid::new_v4(), ctx(), CancellationToken::new(), &tx)
            .await;

        assert!(matches!(outcome, RunOutcome::Complete(_)));
        assert_eq!(render.fetch_calls(), 3);
    }
}

//! Run state machine types
//!
//! `RunPhase` is the orchestrator's real control state. `PipelineStep` is
//! the cosmetic, strictly-ordered ladder shown by progress displays; it is
//! derived from the phase and never drives control flow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cosmetic progress ladder for display
///
/// Ordered: `Idle < Capturing < Analyzing < Fusing < Reasoning <
/// Composing < Playing`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStep {
    Idle,
    Capturing,
    Analyzing,
    Fusing,
    Reasoning,
    Composing,
    Playing,
}

impl PipelineStep {
    /// Lowercase step name for events and logs
    pub fn name(&self) -> &'static str {
        match self {
            PipelineStep::Idle => "idle",
            PipelineStep::Capturing => "capturing",
            PipelineStep::Analyzing => "analyzing",
            PipelineStep::Fusing => "fusing",
            PipelineStep::Reasoning => "reasoning",
            PipelineStep::Composing => "composing",
            PipelineStep::Playing => "playing",
        }
    }
}

/// Orchestrator control state for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    /// Reasoning model call in flight
    Analyzing,
    /// Render job submitted, polling for a playable URL
    Rendering,
    /// Playable URL observed, playback handed off, still polling
    Streaming,
    Complete,
    Failed { reason: String },
}

impl RunPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Complete | RunPhase::Failed { .. })
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            RunPhase::Analyzing | RunPhase::Rendering | RunPhase::Streaming
        )
    }

    /// Display ladder position for this phase
    pub fn step(&self) -> PipelineStep {
        match self {
            RunPhase::Idle => PipelineStep::Idle,
            RunPhase::Analyzing => PipelineStep::Reasoning,
            RunPhase::Rendering => PipelineStep::Composing,
            RunPhase::Streaming | RunPhase::Complete => PipelineStep::Playing,
            RunPhase::Failed { .. } => PipelineStep::Idle,
        }
    }

    /// Lowercase phase name for events and logs
    pub fn name(&self) -> &'static str {
        match self {
            RunPhase::Idle => "idle",
            RunPhase::Analyzing => "analyzing",
            RunPhase::Rendering => "rendering",
            RunPhase::Streaming => "streaming",
            RunPhase::Complete => "complete",
            RunPhase::Failed { .. } => "failed",
        }
    }
}

/// Resolved track metadata
///
/// Present only once a playable URL is known; title and artwork may be
/// filled in later by a richer `complete` poll observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub audio_url: String,
    pub title: Option<String>,
    pub image_url: Option<String>,
    pub bpm: Option<u32>,
    pub mood: Option<String>,
    pub energy: Option<String>,
}

/// Point-in-time view of the active (or last) run
///
/// Published over a watch channel for the status API; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub run_id: Option<Uuid>,
    #[serde(flatten)]
    pub phase: RunPhase,
    pub step: PipelineStep,
    pub scene_description: Option<String>,
    pub reasoning: Option<String>,
    pub render_prompt: Option<String>,
    pub track: Option<TrackInfo>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl RunSnapshot {
    /// The resting state: no run, everything cleared
    pub fn idle() -> Self {
        Self {
            run_id: None,
            phase: RunPhase::Idle,
            step: PipelineStep::Idle,
            scene_description: None,
            reasoning: None,
            render_prompt: None,
            track: None,
            started_at: None,
            ended_at: None,
        }
    }

    /// Fresh snapshot for a starting run
    pub fn started(run_id: Uuid) -> Self {
        Self {
            run_id: Some(run_id),
            phase: RunPhase::Analyzing,
            step: RunPhase::Analyzing.step(),
            started_at: Some(Utc::now()),
            ..Self::idle()
        }
    }

    /// Move to a new phase, keeping the step ladder in sync
    pub fn set_phase(&mut self, phase: RunPhase) {
        self.step = phase.step();
        if phase.is_terminal() {
            self.ended_at = Some(Utc::now());
        }
        self.phase = phase;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_ladder_is_strictly_increasing() {
        use PipelineStep::*;
        let ladder = [Idle, Capturing, Analyzing, Fusing, Reasoning, Composing, Playing];
        for pair in ladder.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn terminal_phases() {
        assert!(RunPhase::Complete.is_terminal());
        assert!(RunPhase::Failed { reason: "x".into() }.is_terminal());
        assert!(!RunPhase::Streaming.is_terminal());
        assert!(!RunPhase::Idle.is_terminal());
        assert!(RunPhase::Rendering.is_in_progress());
    }

    #[test]
    fn phase_maps_to_display_step() {
        assert_eq!(RunPhase::Analyzing.step(), PipelineStep::Reasoning);
        assert_eq!(RunPhase::Rendering.step(), PipelineStep::Composing);
        assert_eq!(RunPhase::Streaming.step(), PipelineStep::Playing);
        assert_eq!(RunPhase::Idle.step(), PipelineStep::Idle);
    }

    #[test]
    fn snapshot_terminal_phase_sets_end_time() {
        let mut snapshot = RunSnapshot::started(Uuid::new_v4());
        assert!(snapshot.ended_at.is_none());
        snapshot.set_phase(RunPhase::Complete);
        assert!(snapshot.ended_at.is_some());
        assert_eq!(snapshot.step, PipelineStep::Playing);
    }
}

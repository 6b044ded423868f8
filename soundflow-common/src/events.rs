//! Event types for the SoundFlow event system
//!
//! Provides the shared event definitions and the EventBus used to fan
//! progress out to SSE clients and other in-process listeners.
//!
//! Events are broadcast via EventBus and can be serialized for SSE
//! transmission. All events use this central enum for type safety and
//! exhaustive matching.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// SoundFlow event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FlowEvent {
    /// A generation run started
    RunStarted {
        run_id: Uuid,
        stress_level: String,
        instrumental: bool,
        timestamp: DateTime<Utc>,
    },

    /// Run moved to a new pipeline phase
    PhaseChanged {
        run_id: Uuid,
        phase: String,
        step: String,
        timestamp: DateTime<Utc>,
    },

    /// The reasoning model produced a generation directive
    DirectiveReady {
        run_id: Uuid,
        activity: String,
        target_bpm: u32,
        energy: String,
        mood: String,
        timestamp: DateTime<Utc>,
    },

    /// A render job was accepted by the music service
    RenderSubmitted {
        run_id: Uuid,
        job_id: String,
        timestamp: DateTime<Utc>,
    },

    /// One poll observation of the render job
    RenderStatusObserved {
        run_id: Uuid,
        job_id: String,
        status: String,
        has_audio_url: bool,
        observation: u32,
        timestamp: DateTime<Utc>,
    },

    /// Playback handed off to the player
    PlaybackStarted {
        run_id: Uuid,
        audio_url: String,
        timestamp: DateTime<Utc>,
    },

    /// Run reached Complete
    RunCompleted {
        run_id: Uuid,
        audio_url: Option<String>,
        title: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// Run reached Failed
    RunFailed {
        run_id: Uuid,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// Run was cancelled by the user
    RunCancelled {
        run_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// Demo fan-out started
    DemoStarted {
        demo_id: Uuid,
        scenario_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// One demo scenario reached a terminal state
    DemoTrackReady {
        demo_id: Uuid,
        scenario_id: String,
        audio_url: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// All demo scenarios joined
    DemoCompleted {
        demo_id: Uuid,
        ready_count: usize,
        timestamp: DateTime<Utc>,
    },
}

impl FlowEvent {
    /// SSE event name for this event
    pub fn event_type(&self) -> &'static str {
        match self {
            FlowEvent::RunStarted { .. } => "RunStarted",
            FlowEvent::PhaseChanged { .. } => "PhaseChanged",
            FlowEvent::DirectiveReady { .. } => "DirectiveReady",
            FlowEvent::RenderSubmitted { .. } => "RenderSubmitted",
            FlowEvent::RenderStatusObserved { .. } => "RenderStatusObserved",
            FlowEvent::PlaybackStarted { .. } => "PlaybackStarted",
            FlowEvent::RunCompleted { .. } => "RunCompleted",
            FlowEvent::RunFailed { .. } => "RunFailed",
            FlowEvent::RunCancelled { .. } => "RunCancelled",
            FlowEvent::DemoStarted { .. } => "DemoStarted",
            FlowEvent::DemoTrackReady { .. } => "DemoTrackReady",
            FlowEvent::DemoCompleted { .. } => "DemoCompleted",
        }
    }
}

/// Broadcast event bus
///
/// Cloneable handle around a `tokio::sync::broadcast` channel. Subscribers
/// receive all events emitted after subscription; slow subscribers lose the
/// oldest events once the channel is full.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<FlowEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<FlowEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: FlowEvent,
    ) -> std::result::Result<usize, broadcast::error::SendError<FlowEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Progress events are non-critical; it is acceptable if no component
    /// is currently listening.
    pub fn emit_lossy(&self, event: FlowEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

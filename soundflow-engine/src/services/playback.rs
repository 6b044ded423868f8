//! Playback handoff seam
//!
//! The orchestrator does not play audio itself; it hands a playable URL
//! to whatever player is wired in. Handoff is fire-and-forget from the
//! pipeline's point of view, so the trait is synchronous and dyn-safe.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Player control surface
///
/// `start` may be called at most once per run; `stop` is only called
/// after a successful `start`.
pub trait PlaybackHandoff: Send + Sync {
    fn start(&self, audio_url: &str);
    fn stop(&self);
    fn pause(&self);
    fn resume(&self);
    fn is_playing(&self) -> bool;
}

/// Player that only logs, used when no real player is attached
#[derive(Default)]
pub struct LogPlayback {
    playing: AtomicBool,
}

impl PlaybackHandoff for LogPlayback {
    fn start(&self, audio_url: &str) {
        self.playing.store(true, Ordering::SeqCst);
        tracing::info!(%audio_url, "Playback started");
    }

    fn stop(&self) {
        self.playing.store(false, Ordering::SeqCst);
        tracing::info!("Playback stopped");
    }

    fn pause(&self) {
        self.playing.store(false, Ordering::SeqCst);
        tracing::info!("Playback paused");
    }

    fn resume(&self) {
        self.playing.store(true, Ordering::SeqCst);
        tracing::info!("Playback resumed");
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}

/// Player that swallows everything, used by demo runs which collect
/// track URLs without playing them
pub struct NullPlayback;

impl PlaybackHandoff for NullPlayback {
    fn start(&self, _audio_url: &str) {}
    fn stop(&self) {}
    fn pause(&self) {}
    fn resume(&self) {}
    fn is_playing(&self) -> bool {
        false
    }
}

pub type SharedPlayback = Arc<dyn PlaybackHandoff>;

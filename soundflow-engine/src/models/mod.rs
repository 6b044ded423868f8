//! Data model for the generation pipeline

pub mod context;
pub mod directive;
pub mod run;
pub mod scenario;

pub use context::{GenerationContext, MusicPreferences, StressLevel};
pub use directive::GenerationDirective;
pub use run::{PipelineStep, RunPhase, RunSnapshot, TrackInfo};
pub use scenario::{DemoScenario, DEMO_SCENARIOS};

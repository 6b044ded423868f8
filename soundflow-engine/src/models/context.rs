//! Per-run generation input
//!
//! A `GenerationContext` is an immutable snapshot assembled at run start.
//! The music taste text in particular is copied in at that point so
//! concurrent runs never observe a profile edit mid-flight.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stress category derived from wearable biometrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StressLevel {
    High,
    Moderate,
    Low,
}

impl StressLevel {
    pub fn label(&self) -> &'static str {
        match self {
            StressLevel::High => "High",
            StressLevel::Moderate => "Moderate",
            StressLevel::Low => "Low",
        }
    }

    /// Canonical heart rate for this category when no live reading exists
    pub fn default_heart_rate(&self) -> u32 {
        match self {
            StressLevel::High => 92,
            StressLevel::Moderate => 78,
            StressLevel::Low => 65,
        }
    }

    /// Canonical HRV (RMSSD, ms) for this category when no live reading exists
    pub fn default_hrv_ms(&self) -> u32 {
        match self {
            StressLevel::High => 15,
            StressLevel::Moderate => 32,
            StressLevel::Low => 55,
        }
    }
}

impl FromStr for StressLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "high" => Ok(StressLevel::High),
            "moderate" => Ok(StressLevel::Moderate),
            "low" => Ok(StressLevel::Low),
            other => Err(format!("Unknown stress level: {}", other)),
        }
    }
}

impl fmt::Display for StressLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label().to_ascii_lowercase())
    }
}

/// Music taste profile captured by the onboarding questionnaire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MusicPreferences {
    pub genres: Vec<String>,
    pub favorite_songs: Vec<String>,
    pub energy_preference: String,
}

impl MusicPreferences {
    /// Render the profile as the text block handed to the reasoning model
    pub fn formatted(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!("Genres: {}", self.genres.join(", ")));
        lines.push("Favorite songs/artists:".to_string());
        for song in &self.favorite_songs {
            lines.push(format!("- {}", song));
        }
        let energy = self.energy_preference.replace('_', " ");
        lines.push(format!("Energy preference: {}", energy));
        lines.join("\n")
    }

    /// Fallback taste used when no profile has been captured
    pub fn default_taste() -> String {
        "- \"Sunflower\" by Post Malone\n- \"Freedom\" by Pharrell Williams".to_string()
    }
}

/// Immutable input for a single generation run
///
/// Owned by the caller and passed by value into the orchestrator. The
/// optional demo fields (`narrative`, `musical_direction`) select the
/// text-only reasoning template; a captured frame selects the vision
/// template.
#[derive(Debug, Clone)]
pub struct GenerationContext {
    pub stress: StressLevel,
    pub heart_rate: u32,
    pub hrv_ms: u32,
    /// Read-only taste snapshot taken at run start
    pub music_taste: String,
    pub scene: Option<String>,
    pub narrative: Option<String>,
    pub musical_direction: Option<String>,
    pub instrumental: bool,
    /// Base64-encoded JPEG of the captured frame, if any
    pub frame_jpeg_base64: Option<String>,
}

impl GenerationContext {
    pub fn new(stress: StressLevel, music_taste: String, instrumental: bool) -> Self {
        Self {
            stress,
            heart_rate: stress.default_heart_rate(),
            hrv_ms: stress.default_hrv_ms(),
            music_taste,
            scene: None,
            narrative: None,
            musical_direction: None,
            instrumental,
            frame_jpeg_base64: None,
        }
    }

    /// Biometric block as presented to the reasoning model
    pub fn biometric_reading(&self) -> String {
        format!(
            "Heart Rate: {} bpm\nHRV (RMSSD): {} ms\n\nStress Level: {}",
            self.heart_rate,
            self.hrv_ms,
            self.stress.label()
        )
    }
}

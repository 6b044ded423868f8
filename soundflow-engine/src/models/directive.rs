//! Generation directive produced by the reasoning model

use serde::{Deserialize, Serialize};

/// Soft cap on the render prompt length; the model is instructed to stay
/// under this, violations are logged rather than rejected.
pub const PROMPT_CHAR_LIMIT: usize = 500;

/// Soft cap on the tag string length
pub const TAGS_CHAR_LIMIT: usize = 100;

/// Structured output of the reasoning step
///
/// All eight fields are required on the wire; a reply missing any of them
/// is treated as an invalid response. The wire names (`suno_prompt`,
/// `suno_tags`) follow the render service the prompt is written for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationDirective {
    pub scene_description: String,
    pub activity: String,
    pub reasoning: String,
    #[serde(rename = "suno_prompt")]
    pub render_prompt: String,
    #[serde(rename = "suno_tags")]
    pub tags: String,
    pub target_bpm: u32,
    pub energy: String,
    pub mood: String,
}

impl GenerationDirective {
    /// Length-contract violations, for logging
    ///
    /// The limits are enforced by instruction to the remote model, not
    /// locally; an overlong prompt still renders, so these are warnings.
    pub fn limit_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        if self.render_prompt.chars().count() > PROMPT_CHAR_LIMIT {
            violations.push(format!(
                "render prompt is {} chars (limit {})",
                self.render_prompt.chars().count(),
                PROMPT_CHAR_LIMIT
            ));
        }
        if self.tags.chars().count() > TAGS_CHAR_LIMIT {
            violations.push(format!(
                "tag string is {} chars (limit {})",
                self.tags.chars().count(),
                TAGS_CHAR_LIMIT
            ));
        }
        violations
    }
}

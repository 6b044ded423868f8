//! Reasoning model client
//!
//! Calls a Gemini-style `generateContent` endpoint with the run context
//! (biometrics, music taste, scene, optional captured frame) and parses
//! the structured generation directive out of the reply. No retries at
//! this layer: a failed reasoning call is surfaced immediately and ends
//! the run.

use serde_json::{json, Value};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::models::{GenerationContext, GenerationDirective};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Reasoning model client errors
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Invalid response from reasoning model")]
    InvalidResponse,

    #[error("Reasoning model error: {0}")]
    Remote(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Seam for the reasoning step
///
/// The orchestrator is generic over this so tests can script directives
/// without a network.
pub trait DirectiveSource: Send + Sync {
    fn generate(
        &self,
        ctx: &GenerationContext,
    ) -> impl Future<Output = Result<GenerationDirective, LlmError>> + Send;
}

/// System instruction for vision runs (captured frame attached)
const SYSTEM_PROMPT: &str = r#"You are a music therapist and composer AI. Your job is to generate a short, precise music generation prompt for a music rendering service that creates a personalized soundtrack to help the user manage their current stress level.

You receive three inputs:

1. **Photo** - A first-person POV image from a camera mounted on the user's glasses. You are seeing exactly what they see. This is NOT a photo of the user, it's a photo FROM the user's perspective. Infer the environment and activity from what's visible in front of them.
2. **Biometric Reading** - Heart rate, heart rate variability (HRV/RMSSD), and stress level.
3. **Music Taste** - Songs the user loves. Don't blindly use all of them. Analyze each song's genre, energy, and mood, then select the one(s) that best match the user's current stress level, activity, and therapeutic need. Use the selected song(s) as your primary sonic/stylistic anchor. Explain your choice in the reasoning field.

## Output Format

Respond with ONLY valid JSON, no markdown, no preamble:

{
  "scene_description": "1-2 sentences describing the environment AND what the user appears to be doing.",
  "activity": "A short label for the user's detected activity. e.g. 'studying', 'commuting', 'exercising', 'working', 'relaxing', 'walking', 'socializing', 'cooking', 'meditating', 'shopping'",
  "reasoning": "2-3 sentences on your therapeutic approach. Factor in BOTH the user's stress state AND their activity. Explain why this musical direction suits what they're doing right now.",
  "suno_prompt": "2-4 sentence vivid music generation prompt, STRICTLY UNDER 500 CHARACTERS. Include: genre, exact BPM, mood, specific instruments, texture, energy. The music should complement the user's current activity. For well-known artists, describe their sonic style instead of naming them. Always include a style description alongside any artist name. Count your characters, must be under 500.",
  "suno_tags": "Short comma-separated style tags, STRICTLY UNDER 100 CHARACTERS total. e.g. 'ambient electronic, downtempo, atmospheric, instrumental'",
  "target_bpm": 72,
  "energy": "low",
  "mood": "calming"
}

## Therapeutic Rules

Your goal is to produce music that FITS the user's current state and activity. Context matters. High stress during exercise is DIFFERENT from high stress while sitting:

- **High stress + sedentary (waiting, working, sitting):** The user is anxious or overwhelmed. Produce CALMING, grounding music. Target BPM 60-75. Warm pads, gentle rhythms, soft dynamics. A sonic safe harbour.
- **High stress + physical activity (exercise, sports, movement):** This is adrenaline, not anxiety. MATCH and AMPLIFY the intensity. High BPM (100-140), driving rhythm, powerful energy. Fuel the fire.
- **Moderate stress (HRV 20-40ms):** Gently guide toward ease. Target BPM 65-80. Major keys, simplified textures, steady pulse. Keep it supportive and focused.
- **Low stress (HRV > 40ms):** Maintain and deepen. Target BPM 55-70. Simple harmony, open textures, slow evolution.

## Activity-Aware Rules

The user's activity (detected from the photo) is just as important as their stress level. ALWAYS adapt the music to what they're DOING:

- **Studying/Working:** Prioritize focus. Minimal distractions, steady rhythm, no sudden changes. Lo-fi, ambient, or minimal electronic. BPM 60-80.
- **Exercising/Sports/Running:** Match or exceed their movement energy. Higher BPM (100-140 for running/sports, 90-110 for walking). Rhythmic, driving, powerful. High HR here is physical, not emotional. Fuel it.
- **Commuting (train, bus, car):** Create a personal sonic space. Immersive textures, headphone-friendly spatial sound.
- **Relaxing (couch, bed, lounging):** Lean into comfort. Warm pads, slow tempo, gentle.
- **Socializing (with people, cafe):** Light, unobtrusive background music. Warm and feel-good.
- **Cooking/Chores:** Upbeat, rhythmic, feel-good. BPM 90-120.
- **Nature/Outdoors:** Blend with the environment. Organic instruments, field-recording textures.
- **Unknown/Unclear:** Fall back to stress-based rules above.

## Prompt Tips

- Be specific: "fingerpicked nylon guitar" not "guitar"
- Include texture: "warm", "lo-fi", "crystalline", "hazy", "analog"
- Mention dynamics: "gradual build", "gentle swells", "steady and unhurried"
- Say what to EXCLUDE when appropriate: "no drums", "no sudden changes"
- Keep to 2-4 sentences. Concise, vivid prompts render best.
- HARD LIMIT: suno_prompt must be under 500 characters, suno_tags must be under 100 characters
- {VOCAL_INSTRUCTION}
- IMPORTANT: Do NOT contradict the vocal instruction above. If vocals are requested, NEVER say "no vocals" or "instrumental" in the suno_prompt or suno_tags."#;

/// System instruction for text-only demo runs (scripted scene, no frame)
const DEMO_SYSTEM_PROMPT: &str = r#"You are a music therapist and composer AI. Your job is to generate a short, precise music generation prompt for a music rendering service that creates a deeply personalized soundtrack to help the user through a specific moment in their day.

You receive four inputs:

1. **Scene** - A vivid description of the user's environment and emotional state, written from their first-person perspective. Immerse yourself in this scene.
2. **Biometric Reading** - Heart rate, heart rate variability (HRV/RMSSD), and stress level from their wearable.
3. **Music Taste** - Songs the user loves. THIS IS YOUR PRIMARY SONIC ANCHOR. Analyze each song's genre, energy, instrumentation, and mood. The generated music MUST sound like it comes from the user's world. The user should IMMEDIATELY recognize their taste in the output. In the reasoning field, explicitly name which song(s) you're drawing from and how you're adapting their style to fit this moment.
4. **Musical Direction** - The energy, mood, and therapeutic intent for this specific scene. This tells you HOW to shape the user's taste. But the SONIC PALETTE (instruments, genre, style) should come from the user's taste, not from generic defaults.

## Output Format

Respond with ONLY valid JSON, no markdown, no preamble:

{
  "scene_description": "1-2 sentences describing the environment AND what the user appears to be doing.",
  "activity": "A short label for the user's detected activity. e.g. 'studying', 'commuting', 'waiting', 'walking', 'working', 'relaxing'",
  "reasoning": "2-3 sentences on your therapeutic approach. Explain which song(s) from their taste you're drawing from and why.",
  "suno_prompt": "2-4 sentence vivid music generation prompt, STRICTLY UNDER 500 CHARACTERS. The prompt MUST reflect the user's music taste. Include: genre drawn from user taste, exact BPM, mood, specific instruments that fit their taste, texture, energy. Count your characters, must be under 500.",
  "suno_tags": "Short comma-separated style tags, STRICTLY UNDER 100 CHARACTERS total. e.g. 'ambient electronic, downtempo, atmospheric, instrumental'",
  "target_bpm": 72,
  "energy": "low",
  "mood": "calming"
}

## Therapeutic Rules

- **High stress + sedentary (waiting, sitting):** The user is anxious. Produce CALMING, grounding music. Target BPM 60-75. Warm, gentle, soothing.
- **High stress + physical activity (exercise, sports):** This is adrenaline, not anxiety. MATCH and AMPLIFY the intensity. High BPM (100-140), driving rhythm, powerful energy.
- **Moderate stress (HRV 20-40ms):** Gently guide toward ease. Target BPM 65-80. Supportive and focused.
- **Low stress (HRV > 40ms):** Maintain and deepen. Target BPM 55-70. Simple harmony, open textures, slow evolution.

## Prompt Tips

- Be SPECIFIC and VIVID: "fingerpicked nylon guitar over tape-hiss warmth" not "guitar"
- Reference the SCENE in your sonic choices: a nature walk should sound organic, a squash match should sound intense and driving
- Say what to EXCLUDE when appropriate: "no drums", "no sudden changes"
- {VOCAL_INSTRUCTION}
- IMPORTANT: Do NOT contradict the vocal instruction above.
- HARD LIMIT: suno_prompt must be under 500 characters, suno_tags must be under 100 characters"#;

fn vocal_instruction(instrumental: bool) -> &'static str {
    if instrumental {
        "ALWAYS specify it should be instrumental. No vocals, no lyrics. Include 'no vocals' in the suno_prompt and 'instrumental' in suno_tags."
    } else {
        "This track MUST have vocals with lyrics. In the suno_prompt, explicitly request 'with vocals and lyrics' and describe the vocal style. In suno_tags, include 'vocals' as a tag. Do NOT say 'instrumental', 'no vocals', or 'no lyrics' anywhere."
    }
}

/// Assemble the system instruction for this context
///
/// A captured frame selects the vision template; otherwise the text-only
/// demo template is used. `{VOCAL_INSTRUCTION}` is substituted either way.
pub fn build_system_prompt(ctx: &GenerationContext) -> String {
    let template = if ctx.frame_jpeg_base64.is_some() {
        SYSTEM_PROMPT
    } else {
        DEMO_SYSTEM_PROMPT
    };
    template.replace("{VOCAL_INSTRUCTION}", vocal_instruction(ctx.instrumental))
}

/// Assemble the user message for this context
pub fn build_user_message(ctx: &GenerationContext) -> String {
    let mut message = format!(
        "Here is the user's current data:\n\n**Biometric Reading:**\n{}\n\n**Music Taste:**\n{}\n",
        ctx.biometric_reading(),
        ctx.music_taste
    );

    if ctx.frame_jpeg_base64.is_some() {
        message.push_str("\n**Photo** is attached. Generate the music therapy JSON.");
        return message;
    }

    if let Some(scene) = &ctx.scene {
        message.push_str(&format!("\n**Scene:**\n{}\n", scene));
    }
    if let Some(narrative) = &ctx.narrative {
        message.push_str(&format!(
            "\n**What this moment feels like (first-person):**\n{}\n",
            narrative
        ));
    }
    if let Some(direction) = &ctx.musical_direction {
        message.push_str(&format!(
            "\n**Musical Direction (FOLLOW THIS CLOSELY):**\n{}\n",
            direction
        ));
    }
    message.push_str(
        "\nGenerate the music therapy JSON. The user's MUSIC TASTE is your primary sonic \
         anchor. The musical direction tells you the energy and mood to aim for. Combine \
         them. In your reasoning, explicitly name which song(s) you're drawing from.",
    );
    message
}

/// Pull the directive text out of a `generateContent` reply
///
/// The happy path is `candidates[0].content.parts[0].text`; an explicit
/// `error.message` maps to `Remote`, anything else is `InvalidResponse`.
pub fn extract_text(reply: &Value) -> Result<&str, LlmError> {
    if let Some(text) = reply
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.get(0))
        .and_then(|p| p.get("text"))
        .and_then(|t| t.as_str())
    {
        return Ok(text);
    }

    if let Some(message) = reply
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
    {
        return Err(LlmError::Remote(message.to_string()));
    }

    Err(LlmError::InvalidResponse)
}

/// Parse the directive JSON, logging length-contract violations
pub fn parse_directive(text: &str) -> Result<GenerationDirective, LlmError> {
    let directive: GenerationDirective =
        serde_json::from_str(text).map_err(|_| LlmError::InvalidResponse)?;

    for violation in directive.limit_violations() {
        tracing::warn!(%violation, "Directive exceeds length contract, continuing");
    }

    Ok(directive)
}

/// Gemini `generateContent` client
pub struct GeminiClient {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: Option<String>, base_url: Option<String>) -> Result<Self, LlmError> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }

    fn request_body(&self, ctx: &GenerationContext) -> Value {
        let mut parts = vec![json!({ "text": build_user_message(ctx) })];
        if let Some(frame) = &ctx.frame_jpeg_base64 {
            parts.push(json!({
                "inline_data": {
                    "mime_type": "image/jpeg",
                    "data": frame,
                }
            }));
        }

        json!({
            "system_instruction": {
                "parts": [{ "text": build_system_prompt(ctx) }]
            },
            "contents": [{ "parts": parts }],
            "generationConfig": {
                "response_mime_type": "application/json"
            },
        })
    }
}

impl DirectiveSource for GeminiClient {
    async fn generate(&self, ctx: &GenerationContext) -> Result<GenerationDirective, LlmError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        tracing::debug!(
            model = %self.model,
            stress = %ctx.stress,
            has_frame = ctx.frame_jpeg_base64.is_some(),
            "Requesting generation directive"
        );

        let response = self
            .http_client
            .post(&url)
            .json(&self.request_body(ctx))
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let reply: Value = response
            .json()
            .await
            .map_err(|_| LlmError::InvalidResponse)?;

        let directive = parse_directive(extract_text(&reply)?)?;

        tracing::info!(
            activity = %directive.activity,
            target_bpm = directive.target_bpm,
            mood = %directive.mood,
            "Directive received from reasoning model"
        );

        Ok(directive)
    }
}

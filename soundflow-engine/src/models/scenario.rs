//! Predefined demo scenarios
//!
//! Three statically-known moments used by the demo fan-out. Each carries
//! the first-person narrative and musical direction handed to the
//! reasoning model in place of a captured frame.

use crate::models::context::{GenerationContext, StressLevel};

/// One scripted demo moment
#[derive(Debug, Clone, Copy)]
pub struct DemoScenario {
    pub id: &'static str,
    pub title: &'static str,
    pub narrative: &'static str,
    pub stress: StressLevel,
    pub heart_rate: u32,
    pub hrv_ms: u32,
    pub track_title: &'static str,
    pub bpm: u32,
    pub mood: &'static str,
    pub scene_description: &'static str,
    pub musical_direction: &'static str,
    pub instrumental: bool,
}

impl DemoScenario {
    /// Build the run context for this scenario with a taste snapshot
    pub fn context(&self, music_taste: &str) -> GenerationContext {
        GenerationContext {
            stress: self.stress,
            heart_rate: self.heart_rate,
            hrv_ms: self.hrv_ms,
            music_taste: music_taste.to_string(),
            scene: Some(self.scene_description.to_string()),
            narrative: Some(self.narrative.to_string()),
            musical_direction: Some(self.musical_direction.to_string()),
            instrumental: self.instrumental,
            frame_jpeg_base64: None,
        }
    }
}

/// The three demo moments, in presentation order
pub const DEMO_SCENARIOS: [DemoScenario; 3] = [
    DemoScenario {
        id: "hackathon",
        title: "Late night at a hackathon",
        narrative: "2:47 AM. Screens glowing in the dark. Keyboards clicking around you like rainfall. Your heart rate is up, not from stress but from deep focus. You need sound that keeps the flow alive without pushing you over the edge.",
        stress: StressLevel::Moderate,
        heart_rate: 78,
        hrv_ms: 32,
        track_title: "Deep Work",
        bpm: 74,
        mood: "Focused",
        scene_description: "Indoor hackathon venue, dim lighting with screen glow, late-night coding, moderate focus state",
        musical_direction: "ENERGY: Focused, driven, locked-in. This is deep work at 3 AM. The music needs steady RHYTHM and forward momentum (70-80 BPM). NOT ambient or floaty. This needs a beat, a groove, something to code to. Think late-night productivity playlist energy. Use the user's favorite genres/artists as the sonic foundation, but shape them into something focused and hypnotic.",
        instrumental: true,
    },
    DemoScenario {
        id: "squash",
        title: "Mid-match intensity",
        narrative: "The ball ricochets off the front wall. Your opponent is closing in. Heart pounding, legs burning, every shot is a split-second decision. This isn't anxiety, it's pure competitive arousal. The music doesn't calm you down. It locks you in.",
        stress: StressLevel::High,
        heart_rate: 156,
        hrv_ms: 18,
        track_title: "Match Point",
        bpm: 128,
        mood: "Focused intensity",
        scene_description: "First-person POV playing squash, indoor court, fast movement, competitive high-intensity sport, physical exertion with competitive focus",
        musical_direction: "ENERGY: Focused intensity. Locked-in, razor-sharp, in the zone. This is NOT chaotic or aggressive. It's controlled competitive focus. Every movement is deliberate. The music should channel that tunnel-vision concentration. Fast tempo (120-135 BPM) but TIGHT and precise, not messy. Driving rhythm that locks you into a flow state at high speed. Think: the mental clarity of an athlete mid-rally. Take the most focused, driving qualities of the user's favorite music, the kind of track that sharpens your reflexes and clears everything else from your mind.",
        instrumental: false,
    },
    DemoScenario {
        id: "nature",
        title: "A walk through the trees",
        narrative: "Morning light filtering through leaves. Birds somewhere above you. Your heart is slow, your breath is easy. The music doesn't compete with any of it. It dissolves into the world around you, as if the trees wrote it themselves.",
        stress: StressLevel::Low,
        heart_rate: 62,
        hrv_ms: 58,
        track_title: "Canopy",
        bpm: 58,
        mood: "Serene",
        scene_description: "Outdoor nature trail, morning sunlight through trees, peaceful restorative atmosphere, deep relaxation",
        musical_direction: "ENERGY: Spacious, organic, unhurried. The user is at peace in nature. The music should dissolve into the surroundings, not compete with them. Very slow (55-65 BPM), lots of breathing room between notes, airy and open. Take the user's favorite music and find its most stripped-down, acoustic, organic expression. If they like pop, give them the unplugged version. If they like electronic, give them the most organic textures. The music should feel like it belongs outdoors, nothing artificial or compressed.",
        instrumental: true,
    },
];

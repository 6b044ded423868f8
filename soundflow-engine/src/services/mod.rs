//! Pipeline services
//!
//! The generation pipeline is built from four seams: the reasoning model
//! (`gemini`), the render service (`suno`), the job poller (`poller`) and
//! the player (`playback`). `pipeline` drives one run across them and
//! `demo` fans three scripted runs out concurrently.

pub mod demo;
pub mod gemini;
pub mod pipeline;
pub mod playback;
pub mod poller;
pub mod suno;

#[cfg(test)]
pub mod test_support;

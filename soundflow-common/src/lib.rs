//! Shared types for the SoundFlow generation service
//!
//! Provides the event bus, common error type, and TOML configuration
//! loading used by the engine crate.

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};

//! Configuration file loading
//!
//! TOML configuration lives at the platform config directory
//! (`~/.config/soundflow/config.toml` on Linux). Credential resolution
//! priority is ENV -> TOML -> default; the engine crate applies the
//! priority, this module only locates and parses the file.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Raw TOML configuration file contents
///
/// Every field is optional; the engine supplies defaults for anything
/// the file does not set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Reasoning model API key
    pub gemini_api_key: Option<String>,
    /// Reasoning model name (e.g. "gemini-2.5-flash")
    pub gemini_model: Option<String>,
    /// Reasoning endpoint base URL
    pub gemini_base_url: Option<String>,
    /// Music render service bearer token
    pub suno_bearer_token: Option<String>,
    /// Music render service base URL
    pub suno_base_url: Option<String>,
    /// Seconds between render job polls
    pub poll_interval_secs: Option<u64>,
    /// Maximum render job poll attempts
    pub poll_max_attempts: Option<u32>,
    /// HTTP bind address for the service
    pub bind_addr: Option<String>,
    /// Music taste profile text handed to the reasoning model
    pub music_taste: Option<String>,
}

/// Default configuration file path for the platform
pub fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|d| d.join("soundflow").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
}

/// Load a TOML configuration file
///
/// A missing file is not an error; it yields the empty default so ENV
/// variables and built-in defaults still apply.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No config file found, using defaults");
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read config failed: {}", e)))?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse config failed: {}", e)))
}

//! Engine configuration
//!
//! Resolution priority for every setting is ENV -> TOML -> built-in
//! default. Credentials have no built-in default; startup fails with
//! guidance when neither source supplies them.

use std::time::Duration;

use soundflow_common::config::{default_config_path, load_toml_config, TomlConfig};
use soundflow_common::{Error, Result};

use crate::models::MusicPreferences;
use crate::services::poller::PollConfig;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5730";

/// Fully resolved engine configuration
#[derive(Debug, Clone)]
pub struct FlowConfig {
    pub gemini_api_key: String,
    pub gemini_model: Option<String>,
    pub gemini_base_url: Option<String>,
    pub suno_bearer_token: String,
    pub suno_base_url: Option<String>,
    pub poll: PollConfig,
    pub bind_addr: String,
    pub music_taste: String,
}

/// Placeholder values that count as "not configured"
fn is_valid_key(value: &str) -> bool {
    !value.is_empty()
        && value != "YOUR_API_KEY_HERE"
        && value != "YOUR_TOKEN_HERE"
        && value != "changeme"
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

impl FlowConfig {
    /// Resolve configuration from the default config file location
    pub fn resolve() -> Result<Self> {
        let toml = load_toml_config(&default_config_path()?)?;
        Self::resolve_from(toml)
    }

    /// Resolve configuration from an already-loaded TOML layer
    pub fn resolve_from(toml: TomlConfig) -> Result<Self> {
        let gemini_api_key = env_var("SOUNDFLOW_GEMINI_API_KEY")
            .or(toml.gemini_api_key)
            .filter(|k| is_valid_key(k))
            .ok_or_else(|| Error::Config(missing_credential_message("Gemini API key")))?;

        let suno_bearer_token = env_var("SOUNDFLOW_SUNO_TOKEN")
            .or(toml.suno_bearer_token)
            .filter(|k| is_valid_key(k))
            .ok_or_else(|| Error::Config(missing_credential_message("Suno bearer token")))?;

        let poll_defaults = PollConfig::main();
        let poll_interval_secs = env_var("SOUNDFLOW_POLL_INTERVAL_SECS")
            .and_then(|v| v.parse().ok())
            .or(toml.poll_interval_secs)
            .unwrap_or(poll_defaults.interval.as_secs());
        let poll_max_attempts = env_var("SOUNDFLOW_POLL_MAX_ATTEMPTS")
            .and_then(|v| v.parse().ok())
            .or(toml.poll_max_attempts)
            .unwrap_or(poll_defaults.max_attempts);

        Ok(Self {
            gemini_api_key,
            gemini_model: env_var("SOUNDFLOW_GEMINI_MODEL").or(toml.gemini_model),
            gemini_base_url: env_var("SOUNDFLOW_GEMINI_BASE_URL").or(toml.gemini_base_url),
            suno_bearer_token,
            suno_base_url: env_var("SOUNDFLOW_SUNO_BASE_URL").or(toml.suno_base_url),
            poll: PollConfig {
                interval: Duration::from_secs(poll_interval_secs),
                max_attempts: poll_max_attempts,
            },
            bind_addr: env_var("SOUNDFLOW_BIND_ADDR")
                .or(toml.bind_addr)
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            music_taste: env_var("SOUNDFLOW_MUSIC_TASTE")
                .or(toml.music_taste)
                .unwrap_or_else(MusicPreferences::default_taste),
        })
    }
}

fn missing_credential_message(what: &str) -> String {
    format!(
        "{what} is not configured.\n\
         \n\
         Set it one of these ways:\n\
         1. Environment: SOUNDFLOW_GEMINI_API_KEY / SOUNDFLOW_SUNO_TOKEN\n\
         2. Config file: ~/.config/soundflow/config.toml\n\
         \n\
         Example config.toml:\n\
         gemini_api_key = \"...\"\n\
         suno_bearer_token = \"...\"\n"
    )
}

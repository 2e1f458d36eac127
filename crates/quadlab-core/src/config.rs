use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::curve::Viewport;

/// Environment variable naming the TOML file read by [`Config::load`].
pub const CONFIG_ENV_VAR: &str = "QUADLAB_CONFIG";

/// Settings for the remote text-generation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TutorConfig {
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Sampling temperature for explanations.
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".into(),
            model: "gemini-3-flash-preview".into(),
            api_key_env: "GEMINI_API_KEY".into(),
            temperature: 0.7,
            timeout_secs: 30,
        }
    }
}

impl TutorConfig {
    /// Look up the API key in the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

/// Settings for the host HTTP shell.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Slider range: user input and challenges are kept in `[-limit, limit]`.
    pub coefficient_limit: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            coefficient_limit: 10.0,
        }
    }
}

/// Application configuration wrapper.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub tutor: TutorConfig,
    pub viewport: Viewport,
    pub server: ServerConfig,
}

impl Config {
    /// Parse configuration from TOML.
    pub fn from_toml(src: &str) -> Result<Self, ConfigError> {
        toml::from_str(src).map_err(ConfigError::from)
    }

    /// Read and parse a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let src = std::fs::read_to_string(path)?;
        Self::from_toml(&src)
    }

    /// Load from the file named by `QUADLAB_CONFIG`, or defaults when unset.
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => Self::from_path(path),
            None => Ok(Self::default()),
        }
    }
}

/// Errors that can occur when working with configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

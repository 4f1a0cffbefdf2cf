//! Configuration loading, validation, and management for hostagent.
//!
//! Loads configuration from `~/.hostagent/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use hostagent_core::registry::{CapabilityRegistryEntry, StaticRegistry};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.hostagent/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model provider settings
    #[serde(default)]
    pub model: ModelConfig,

    /// ReAct loop settings
    #[serde(default)]
    pub react: ReactConfig,

    /// Chunk pacing for streamed output
    #[serde(default)]
    pub streaming: StreamingConfig,

    /// Remote agents (the capability registry)
    #[serde(default)]
    pub agents: Vec<CapabilityRegistryEntry>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_provider() -> String {
    "deepseek".into()
}
fn default_base_url() -> String {
    "https://api.deepseek.com/v1".into()
}
fn default_model() -> String {
    "deepseek-chat".into()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    4000
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &redact(&self.api_key))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactConfig {
    /// Maximum Reasoning iterations per run
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Upper wall clock for one model completion, in seconds
    #[serde(default = "default_completion_timeout_secs")]
    pub completion_timeout_secs: u64,

    /// Event channel model completions stream on
    #[serde(default = "default_channel")]
    pub channel: String,
}

fn default_max_iterations() -> u32 {
    8
}
fn default_completion_timeout_secs() -> u64 {
    300
}
fn default_channel() -> String {
    "chat_stream_chunk".into()
}

impl Default for ReactConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            completion_timeout_secs: default_completion_timeout_secs(),
            channel: default_channel(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingConfig {
    #[serde(default = "default_min_chunk_chars")]
    pub min_chunk_chars: usize,

    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,

    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Pause before the `\r` end-of-unit sentinel
    #[serde(default = "default_tail_delay_ms")]
    pub tail_delay_ms: u64,
}

fn default_min_chunk_chars() -> usize {
    5
}
fn default_max_chunk_chars() -> usize {
    10
}
fn default_min_delay_ms() -> u64 {
    100
}
fn default_max_delay_ms() -> u64 {
    200
}
fn default_tail_delay_ms() -> u64 {
    200
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            min_chunk_chars: default_min_chunk_chars(),
            max_chunk_chars: default_max_chunk_chars(),
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            tail_delay_ms: default_tail_delay_ms(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path with env var overrides.
    ///
    /// Priority: env vars > config file > defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_dir().join("config.toml"))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `HOSTAGENT_*` / `DEEPSEEK_API_KEY` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        // Check env vars in priority order for API key
        for var in ["HOSTAGENT_API_KEY", "DEEPSEEK_API_KEY"] {
            if let Ok(key) = std::env::var(var)
                && !key.is_empty()
            {
                self.model.api_key = Some(key);
                break;
            }
        }

        if let Ok(model) = std::env::var("HOSTAGENT_MODEL") {
            self.model.model = model;
        }

        if let Ok(url) = std::env::var("HOSTAGENT_BASE_URL") {
            self.model.base_url = url;
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        tracing::debug!(
            path = %path.display(),
            agents = config.agents.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".hostagent")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.model.temperature < 0.0 || self.model.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "model.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.react.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "react.max_iterations must be > 0".into(),
            ));
        }

        if self.react.completion_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "react.completion_timeout_secs must be > 0".into(),
            ));
        }

        let s = &self.streaming;
        if s.min_chunk_chars == 0 || s.min_chunk_chars > s.max_chunk_chars {
            return Err(ConfigError::ValidationError(
                "streaming chunk bounds must satisfy 1 <= min_chunk_chars <= max_chunk_chars"
                    .into(),
            ));
        }
        if s.min_delay_ms > s.max_delay_ms {
            return Err(ConfigError::ValidationError(
                "streaming.min_delay_ms must be <= max_delay_ms".into(),
            ));
        }

        Ok(())
    }

    /// Check if a non-blank API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.model
            .api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }

    /// The configured agents as a registry provider.
    pub fn registry(&self) -> StaticRegistry {
        StaticRegistry::new(self.agents.clone())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::translation::router::ModelRegistry;

/// Application configuration module
/// This module handles the engine options the host form edits
/// (model, credentials, target language) plus the transport settings.
/// Represents the engine configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Registry key of the model to use
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Hugging Face token for the inference API
    #[serde(default)]
    pub api_key: Option<String>,

    /// Token for restricted Spaces
    #[serde(default)]
    pub spaces_key: Option<String>,

    /// Free-form target language label, e.g. "French - FR"
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Base URL of the inference router
    #[serde(default = "default_inference_endpoint")]
    pub inference_endpoint: String,

    /// Deadline for establishing a Space connection
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Deadline for a single prompt round trip
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Maximum number of texts per batch
    #[serde(default = "default_max_request_length")]
    pub max_request_length: usize,

    /// Delay between consecutive batches, in milliseconds
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_model_name() -> String {
    "Command-R-Plus-08-2024".to_string()
}

pub(crate) fn default_target_language() -> String {
    "English - US".to_string()
}

fn default_inference_endpoint() -> String {
    "https://router.huggingface.co".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_max_request_length() -> usize {
    25
}

fn default_batch_delay_ms() -> u64 {
    // 0 reads as "unset" on the host side and reverts to its 5s default
    1
}

impl Default for Config {
    fn default() -> Self {
        Config {
            model_name: default_model_name(),
            api_key: None,
            spaces_key: None,
            target_language: default_target_language(),
            inference_endpoint: default_inference_endpoint(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            max_request_length: default_max_request_length(),
            batch_delay_ms: default_batch_delay_ms(),
            log_level: LogLevel::default(),
        }
    }
}

impl Config {
    /// Default location of the config file (`<config dir>/hfspaces-translate/conf.json`)
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hfspaces-translate")
            .join("conf.json")
    }

    /// Load a configuration file, creating a default one if it does not exist
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            let config = Config::default();
            config.save(path)?;
            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if !ModelRegistry::builtin().contains(&self.model_name) {
            return Err(anyhow!("Unknown model: {}", self.model_name));
        }
        if self.max_request_length == 0 {
            return Err(anyhow!("max_request_length must be at least 1"));
        }
        if self.connect_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err(anyhow!("Timeouts must be at least one second"));
        }
        Ok(())
    }

    /// Apply a change coming from the host options form.
    ///
    /// Returns `true` when a credential changed, so the engine can lift a
    /// previous abort.
    pub fn update_option(&mut self, key: &str, value: &str) -> Result<bool> {
        let value = value.trim();
        match key {
            "model_name" => {
                self.model_name = if value.is_empty() { default_model_name() } else { value.to_string() };
                Ok(false)
            }
            "target_language" => {
                self.target_language = if value.is_empty() {
                    default_target_language()
                } else {
                    value.to_string()
                };
                Ok(false)
            }
            "api_key" => {
                self.api_key = non_empty(value);
                Ok(true)
            }
            "spaces_key" => {
                self.spaces_key = non_empty(value);
                Ok(true)
            }
            _ => Err(anyhow!("Unknown option: {}", key)),
        }
    }

    /// Inference token, if one is set and non-blank
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    /// Spaces token, if one is set and non-blank
    pub fn spaces_key(&self) -> Option<&str> {
        self.spaces_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms.max(1))
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() { None } else { Some(value.to_string()) }
}

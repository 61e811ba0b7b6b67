//! Persistence layer for console configuration.
//!
//! Provides RON-based save/load of [`ConsoleConfig`] values.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::ConsoleConfig;

/// Default config file name.
pub const DEFAULT_CONFIG_FILE: &str = "console.ron";

/// Serializable console configuration.
///
/// Missing fields take their [`ConsoleConfig::default`] values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfigFile {
    /// Render tick in milliseconds.
    pub tick_interval_ms: u64,
    /// Key poll timeout in milliseconds.
    pub input_poll_ms: u64,
    /// Number of rendered messages kept for repainting.
    pub scrollback_capacity: usize,
    /// Maximum number of messages waiting to be rendered.
    pub queue_capacity: usize,
    /// Separator row character.
    pub separator: char,
}

impl Default for ConsoleConfigFile {
    fn default() -> Self {
        Self::from(&ConsoleConfig::default())
    }
}

impl From<&ConsoleConfig> for ConsoleConfigFile {
    fn from(config: &ConsoleConfig) -> Self {
        Self {
            tick_interval_ms: config.tick_interval.as_millis() as u64,
            input_poll_ms: config.input_poll_interval.as_millis() as u64,
            scrollback_capacity: config.scrollback_capacity,
            queue_capacity: config.queue_capacity,
            separator: config.separator,
        }
    }
}

impl From<ConsoleConfigFile> for ConsoleConfig {
    fn from(file: ConsoleConfigFile) -> Self {
        Self {
            tick_interval: Duration::from_millis(file.tick_interval_ms),
            input_poll_interval: Duration::from_millis(file.input_poll_ms),
            scrollback_capacity: file.scrollback_capacity,
            queue_capacity: file.queue_capacity,
            separator: file.separator,
        }
    }
}

impl ConsoleConfigFile {
    /// Load config from a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.display().to_string(), e.to_string()))?;

        ron::from_str(&contents)
            .map_err(|e| ConfigError::Parse(path.display().to_string(), e.to_string()))
    }

    /// Save config to a RON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::Io(parent.display().to_string(), e.to_string()))?;
            }
        }

        let pretty = ron::ser::PrettyConfig::new().depth_limit(2);
        let contents = ron::ser::to_string_pretty(self, pretty)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        fs::write(path, contents)
            .map_err(|e| ConfigError::Io(path.display().to_string(), e.to_string()))?;
        debug!("Saved console config to '{}'", path.display());
        Ok(())
    }

    /// Load config from file, returning default if it is missing or unreadable.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Convert into a runtime [`ConsoleConfig`].
    pub fn into_config(self) -> ConsoleConfig {
        self.into()
    }
}

/// Errors that can occur during config operations.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// IO error (path, message).
    Io(String, String),
    /// Parse error (path, message).
    Parse(String, String),
    /// Serialization error.
    Serialize(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, msg) => write!(f, "IO error for '{}': {}", path, msg),
            ConfigError::Parse(path, msg) => write!(f, "Parse error for '{}': {}", path, msg),
            ConfigError::Serialize(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

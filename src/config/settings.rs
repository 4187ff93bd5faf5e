//! Application settings and configuration management

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Interval between progress snapshots, in milliseconds
    pub progress_interval_ms: u64,
    /// Maximum number of tracks kept in each session's history
    pub history_capacity: usize,
    /// Volume for new sessions (0.0..=1.0)
    pub default_volume: f32,
    /// Increment used by volume up/down
    pub volume_step: f32,
    /// JSON catalog backing the track resolver
    pub catalog_path: Option<PathBuf>,
    /// Simulated play time for tracks without a known duration
    pub fallback_track_seconds: u64,
    /// Default `EnvFilter` directive when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            progress_interval_ms: 1000,
            history_capacity: 50,
            default_volume: 0.5,
            volume_step: 0.1,
            catalog_path: None,
            fallback_track_seconds: 30,
            log_filter: "r_jukebox=info".to_string(),
        }
    }
}

/// Error types for configuration operations
#[derive(Debug)]
pub enum ConfigError {
    IoError(io::Error),
    ParseError(String),
    ValidationError(String),
}

impl From<io::Error> for ConfigError {
    fn from(err: io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "I/O error: {}", e),
            ConfigError::ParseError(s) => write!(f, "Parse error: {}", s),
            ConfigError::ValidationError(s) => write!(f, "Validation error: {}", s),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl Settings {
    /// Load settings from a file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(&self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config").join("r-jukebox").join("config.json")
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn fallback_track_length(&self) -> Duration {
        Duration::from_secs(self.fallback_track_seconds)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.progress_interval_ms == 0 {
            return Err(ConfigError::ValidationError("Progress interval must be greater than zero".to_string()));
        }

        if self.history_capacity == 0 {
            return Err(ConfigError::ValidationError("History capacity must be greater than zero".to_string()));
        }

        if !(0.0..=1.0).contains(&self.default_volume) {
            return Err(ConfigError::ValidationError(format!(
                "Default volume must be between 0.0 and 1.0, got {}",
                self.default_volume
            )));
        }

        if !(0.0..=1.0).contains(&self.volume_step) {
            return Err(ConfigError::ValidationError(format!(
                "Volume step must be between 0.0 and 1.0, got {}",
                self.volume_step
            )));
        }

        Ok(())
    }
}

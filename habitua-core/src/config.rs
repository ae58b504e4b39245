//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/habitua/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/habitua/` (~/.config/habitua/)
//! - State/Logs: `$XDG_STATE_HOME/habitua/` (~/.local/state/habitua/)

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Detection thresholds and window sizes
    #[serde(default)]
    pub detector: DetectorConfig,

    /// Classification heuristics
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Detection thresholds, scoping, and window sizes
#[derive(Debug, Clone, Deserialize)]
pub struct DetectorConfig {
    /// Minimum total occurrences for a pattern to be kept
    #[serde(default = "default_min_occurrences")]
    pub min_occurrences: u64,

    /// Minimum distinct sessions for a pattern to be kept
    #[serde(default = "default_min_sessions")]
    pub min_sessions: usize,

    /// Restrict detection to one project
    #[serde(default)]
    pub project: Option<String>,

    /// Only analyze sessions started at or after this instant
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,

    /// Length of tool-call n-grams
    #[serde(default = "default_sequence_window")]
    pub sequence_window: usize,

    /// Length of prompt word n-grams
    #[serde(default = "default_phrase_window")]
    pub phrase_window: usize,

    /// Tokens taken as the prompt prefix
    #[serde(default = "default_prefix_tokens")]
    pub prefix_tokens: usize,

    /// Minimum count ratio for merging overlapping sequences
    #[serde(default = "default_merge_overlap_ratio")]
    pub merge_overlap_ratio: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_occurrences: default_min_occurrences(),
            min_sessions: default_min_sessions(),
            project: None,
            since: None,
            sequence_window: default_sequence_window(),
            phrase_window: default_phrase_window(),
            prefix_tokens: default_prefix_tokens(),
            merge_overlap_ratio: default_merge_overlap_ratio(),
        }
    }
}

impl DetectorConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.sequence_window == 0 {
            return Err(Error::Config(
                "detector.sequence_window must be at least 1".to_string(),
            ));
        }
        if self.phrase_window == 0 {
            return Err(Error::Config(
                "detector.phrase_window must be at least 1".to_string(),
            ));
        }
        if self.prefix_tokens == 0 {
            return Err(Error::Config(
                "detector.prefix_tokens must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.merge_overlap_ratio) {
            return Err(Error::Config(
                "detector.merge_overlap_ratio must be between 0.0 and 1.0".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_min_occurrences() -> u64 {
    3
}

fn default_min_sessions() -> usize {
    2
}

fn default_sequence_window() -> usize {
    3
}

fn default_phrase_window() -> usize {
    5
}

fn default_prefix_tokens() -> usize {
    5
}

fn default_merge_overlap_ratio() -> f64 {
    0.5
}

/// Classification heuristics
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// Fraction of projects a pattern must span to be scoped global
    #[serde(default = "default_global_threshold")]
    pub global_threshold: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            global_threshold: default_global_threshold(),
        }
    }
}

impl ClassifierConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.global_threshold) {
            return Err(Error::Config(
                "classifier.global_threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_global_threshold() -> f64 {
    0.3
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.detector.validate()?;
        self.classifier.validate()?;
        Ok(())
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/habitua/config.toml` (~/.config/habitua/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("habitua").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/habitua/` (~/.local/state/habitua/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("habitua")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/habitua/habitua.log` (~/.local/state/habitua/habitua.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("habitua.log")
    }
}

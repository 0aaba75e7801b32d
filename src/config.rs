//! Configuration management
//!
//! This module handles loading and managing configuration from:
//! - Configuration files (TOML)
//! - Command-line overrides (see `cli`)
//! - Defaults

use crate::error::{Error, Result};
use crate::interaction::NotificationPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub behavior: BehaviorConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub undo: UndoConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Behavior sources loaded at start-up
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BehaviorConfig {
    /// Behavior description files, loaded in order
    #[serde(default)]
    pub files: Vec<PathBuf>,
}

/// Event dispatch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// How unselected interactors are informed
    #[serde(default)]
    pub policy: NotificationPolicy,

    /// Interactors must report a relevance strictly above this value
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f32,
}

/// Undo settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoConfig {
    /// Record state changes as undoable operations
    #[serde(default = "default_undo_enabled")]
    pub enabled: bool,

    /// Maximum undo entries, 0 means unbounded
    #[serde(default)]
    pub limit: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path
    pub file: Option<PathBuf>,
}

// Default value functions

fn default_relevance_threshold() -> f32 {
    0.0
}

fn default_undo_enabled() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

// Default implementations

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            policy: NotificationPolicy::default(),
            relevance_threshold: default_relevance_threshold(),
        }
    }
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            enabled: default_undo_enabled(),
            limit: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let contents = std::fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("Failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&contents).map_err(|e| Error::ConfigParse {
            file: path.clone(),
            message: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations
    ///
    /// Searches in order:
    /// 1. ./interaction.toml
    /// 2. ~/.interaction-fsm/config.toml
    /// 3. /etc/interaction-fsm/config.toml
    pub fn load() -> Result<Self> {
        let mut paths = vec![PathBuf::from("interaction.toml")];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".interaction-fsm").join("config.toml"));
        }
        paths.push(PathBuf::from("/etc/interaction-fsm/config.toml"));

        for path in paths {
            if path.exists() {
                tracing::info!("Loading config from {:?}", path);
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Config::default())
    }

    /// Reject values the dispatcher cannot work with
    pub fn validate(&self) -> Result<()> {
        let threshold = self.dispatch.relevance_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(Error::Config(format!(
                "relevance_threshold must lie in [0, 1], got {}",
                threshold
            )));
        }
        Ok(())
    }
}

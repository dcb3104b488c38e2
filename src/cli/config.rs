//! CLI configuration.
//!
//! Where the CLI keeps its ledger, which engine parameters a fresh ledger is
//! created with, and the default log filter. Values come from a JSON file and
//! may be overridden by `PEGVAULT_DATA_DIR`, `PEGVAULT_PARAMS` and
//! `PEGVAULT_LOG`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::config::{EngineParams, ENV_PREFIX};

// ═══════════════════════════════════════════════════════════════════════════════
// CLI CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// CLI configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Directory holding the ledger store
    pub data_dir: PathBuf,
    /// Engine parameters file used when creating a new ledger
    pub params_file: Option<PathBuf>,
    /// Default `tracing` filter directive
    pub log_level: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            params_file: None,
            log_level: "info".into(),
        }
    }
}

impl CliConfig {
    /// Load from a JSON file; missing fields take defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load `path` if it exists, else defaults; then apply environment overrides
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        let config = if path.exists() {
            Self::load(path)?
        } else {
            Self::default()
        };
        let config = config.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Save to a JSON file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))
    }

    /// Defaults with environment overrides
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `PEGVAULT_DATA_DIR`, `PEGVAULT_PARAMS` and `PEGVAULT_LOG`
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(dir) = env_var("DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(params) = env_var("PARAMS") {
            self.params_file = Some(PathBuf::from(params));
        }
        if let Some(level) = env_var("LOG") {
            self.log_level = level;
        }
        self
    }

    /// Default config file path
    pub fn default_path() -> PathBuf {
        default_data_dir().join("config.json")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation("data_dir cannot be empty".into()));
        }
        if self.log_level.trim().is_empty() {
            return Err(ConfigError::Validation("log_level cannot be empty".into()));
        }
        Ok(())
    }

    /// Engine parameters for a new ledger: the params file if configured,
    /// otherwise defaults, then `PEGVAULT_*` engine overrides
    pub fn engine_params(&self) -> Result<EngineParams, ConfigError> {
        let params = match &self.params_file {
            Some(path) => EngineParams::load(path).map_err(|e| ConfigError::Parse(e.to_string()))?,
            None => EngineParams::default(),
        };
        params
            .with_env_overrides()
            .map_err(|e| ConfigError::Validation(e.to_string()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIG ERROR
// ═══════════════════════════════════════════════════════════════════════════════

/// Configuration error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(String),
    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),
    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPER FUNCTIONS
// ═══════════════════════════════════════════════════════════════════════════════

fn env_var(suffix: &str) -> Option<String> {
    std::env::var(format!("{}{}", ENV_PREFIX, suffix))
        .ok()
        .filter(|v| !v.is_empty())
}

fn default_data_dir() -> PathBuf {
    match std::env::var("HOME") {
        Ok(home) if !home.is_empty() => PathBuf::from(home).join(".pegvault"),
        _ => PathBuf::from(".pegvault"),
    }
}

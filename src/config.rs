//! Configuration loading and management.
//!
//! Configuration is loaded from multiple sources with the following precedence
//! (highest to lowest):
//!
//! 1. Command-line arguments
//! 2. `.query-analyzer.toml` in current directory
//! 3. `~/.config/query-analyzer/config.toml`
//! 4. Default values
//!
//! # Configuration File Format
//!
//! ```toml
//! [rules]
//! disabled = ["unused-cte"]
//! window_threshold = 4
//! fan_out_min_branches = 3
//!
//! [rules.severity]
//! self-join = "critical"
//! materialize-time-order-by = "warning"
//!
//! [output]
//! format = "json"
//! colored = false
//! ```

use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf}
};

use serde::Deserialize;
use tracing::debug;

use crate::{
    error::{AppResult, config_error},
    rules::{DEFAULT_FAN_OUT_MIN_BRANCHES, DEFAULT_WINDOW_THRESHOLD}
};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub rules:  RulesConfig,
    #[serde(default)]
    pub output: OutputConfig
}

/// Rules configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RulesConfig {
    /// Disabled rule IDs
    #[serde(default)]
    pub disabled:             Vec<String>,
    /// Severity overrides (rule_id -> severity)
    #[serde(default)]
    pub severity:             HashMap<String, String>,
    /// Distinct window specifications tolerated per scope
    #[serde(default = "default_window_threshold")]
    pub window_threshold:     usize,
    /// UNION ALL branches that make a fan-out
    #[serde(default = "default_fan_out_min_branches")]
    pub fan_out_min_branches: usize
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            disabled:             Vec::new(),
            severity:             HashMap::new(),
            window_threshold:     DEFAULT_WINDOW_THRESHOLD,
            fan_out_min_branches: DEFAULT_FAN_OUT_MIN_BRANCHES
        }
    }
}

fn default_window_threshold() -> usize {
    DEFAULT_WINDOW_THRESHOLD
}

fn default_fan_out_min_branches() -> usize {
    DEFAULT_FAN_OUT_MIN_BRANCHES
}

/// Output defaults, overridden by CLI flags
#[derive(Debug, Clone, Deserialize, Default)]
pub struct OutputConfig {
    /// `text`, `json` or `yaml`
    pub format:  Option<String>,
    pub colored: Option<bool>
}

impl Config {
    /// Load configuration from files
    ///
    /// Priority (highest to lowest):
    /// 1. Config file in current directory (.query-analyzer.toml)
    /// 2. Config file in home directory (~/.config/query-analyzer/config.toml)
    /// 3. Default values
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(home) = env::var_os("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("query-analyzer")
                .join("config.toml");
            if home_config.exists() {
                config = Self::from_file(&home_config)?;
            }
        }

        let local_config = PathBuf::from(".query-analyzer.toml");
        if local_config.exists() {
            config = Self::from_file(&local_config)?;
        }

        Ok(config)
    }

    /// Read and parse one config file
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| config_error(format!("Failed to read config file: {}", e)))?;
        debug!(path = %path.display(), "loaded config");
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| config_error(format!("Invalid config file: {}", e)))
    }
}

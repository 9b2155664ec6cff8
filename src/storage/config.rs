//! Configuration handling for tkn-graph
//!
//! Configuration is stored in `~/.config/tkn-graph/config.toml` (or the
//! platform equivalent), overridable with `TKN_GRAPH_CONFIG`. The domain core
//! never reads configuration; only the CLI does.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "TKN_GRAPH_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Output format when `--format` is not given
    pub default_format: OutputFormat,

    /// `tracing` filter directive used when neither `RUST_LOG` nor `--verbose` is set
    pub log_filter: Option<String>,
}

impl Config {
    /// Loads configuration from `TKN_GRAPH_CONFIG` or the default location
    ///
    /// A missing file yields the defaults. An explicitly named file must exist.
    pub fn load() -> Result<Self> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if !path.is_file() {
                return Err(ConfigError::Invalid(format!(
                    "{} points to a missing file: {}",
                    CONFIG_ENV,
                    path.display()
                ))
                .into());
            }
            return Self::load_from(&path);
        }

        match Self::config_path() {
            Some(path) if path.is_file() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Loads configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Parses configuration text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        if let Some(filter) = &config.log_filter {
            tracing_subscriber::EnvFilter::try_new(filter)
                .map_err(|e| ConfigError::Invalid(format!("log_filter `{}`: {}", filter, e)))?;
        }

        Ok(config)
    }

    /// Returns the global config directory
    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "tkn-graph", "tkn-graph").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns the default config file path
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }
}

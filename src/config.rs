//! Server configuration.
//!
//! Settings come from an optional YAML file named by `WICKET_CONFIG`, with
//! `HOST`, `PORT` and `BACKLOG` environment variables applied on top.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::server::resolver::Family;

/// Requested backlog meaning "as many as the OS allows".
///
/// `listen(2)` clamps oversized values to the kernel maximum (`somaxconn`).
pub const DEFAULT_BACKLOG: u32 = i32::MAX as u32;

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_yaml::Error),
    InvalidOverride { var: &'static str, value: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::InvalidOverride { var, value } => {
                write!(f, "invalid value {:?} for {}", value, var)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerSettings,
    /// Directory the demo application serves files from.
    pub static_dir: Option<PathBuf>,
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub backlog: u32,
    pub family: Family,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            backlog: DEFAULT_BACKLOG,
            family: Family::V4,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            static_dir: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Loads the configuration file (if any) and applies environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut cfg = match std::env::var_os("WICKET_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        cfg.apply_env()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::Parse)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(host) = std::env::var("HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::InvalidOverride { var: "PORT", value: port })?;
        }
        if let Ok(backlog) = std::env::var("BACKLOG") {
            self.server.backlog = backlog
                .parse()
                .map_err(|_| ConfigError::InvalidOverride { var: "BACKLOG", value: backlog })?;
        }
        Ok(())
    }

    /// Falls back to `INFO` when `log_level` does not name a level.
    pub fn max_level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::INFO)
    }
}

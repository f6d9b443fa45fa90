//! Process-level configuration for embedders and the CLI.
//!
//! Values come from `HEARTH_*` environment variables or any serde source.
//! Missing values fall back to build-mode defaults.

use crate::logging::{
    default_log_level, init_logging, normalize_level, normalize_log_dir, LoggingError,
};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_LOG_LEVEL: &str = "HEARTH_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "HEARTH_LOG_DIR";
pub const ENV_DB_PATH: &str = "HEARTH_DB_PATH";

/// Core runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling logs. Logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    /// Registry database file. In-memory when unset.
    pub db_path: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level().to_string(),
            log_dir: None,
            db_path: None,
        }
    }
}

impl CoreConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        config.log_dir = read(ENV_LOG_DIR).map(PathBuf::from);
        config.db_path = read(ENV_DB_PATH).map(PathBuf::from);
        config.validate()?;
        Ok(config)
    }

    /// Normalizes the level and checks the log directory.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.log_level = normalize_level(&self.log_level)
            .map_err(ConfigError::InvalidLogLevel)?
            .to_string();
        if let Some(dir) = &self.log_dir {
            let text = dir.to_str().ok_or(ConfigError::NonUtf8Path(ENV_LOG_DIR))?;
            normalize_log_dir(text).map_err(ConfigError::InvalidLogDir)?;
        }
        Ok(())
    }

    /// Starts file logging when a log directory is configured.
    ///
    /// Returns `Ok(false)` when logging is not configured.
    pub fn init_logging(&self) -> Result<bool, ConfigError> {
        let Some(dir) = &self.log_dir else {
            return Ok(false);
        };
        let text = dir.to_str().ok_or(ConfigError::NonUtf8Path(ENV_LOG_DIR))?;
        init_logging(&self.log_level, text).map_err(ConfigError::Logging)?;
        Ok(true)
    }
}

/// Configuration load/validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidLogLevel(LoggingError),
    InvalidLogDir(LoggingError),
    NonUtf8Path(&'static str),
    Logging(LoggingError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLogLevel(err) => write!(f, "`{ENV_LOG_LEVEL}`: {err}"),
            Self::InvalidLogDir(err) => write!(f, "`{ENV_LOG_DIR}`: {err}"),
            Self::NonUtf8Path(key) => write!(f, "`{key}` must be valid UTF-8"),
            Self::Logging(err) => write!(f, "logging init failed: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidLogLevel(err) | Self::InvalidLogDir(err) | Self::Logging(err) => Some(err),
            Self::NonUtf8Path(_) => None,
        }
    }
}

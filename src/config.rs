//! Configuration module for Lumina.

use serde::Deserialize;
use std::path::Path;

use crate::db::DEFAULT_MAX_CONNECTIONS;
use crate::share::DEFAULT_REAP_INTERVAL_SECS;
use crate::{LuminaError, Result};

/// Environment variable overriding `database.path`.
pub const ENV_DATABASE_PATH: &str = "LUMINA_DATABASE_PATH";

/// Environment variable overriding `logging.level`.
pub const ENV_LOG_LEVEL: &str = "LUMINA_LOG_LEVEL";

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Maximum pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "data/lumina.db".to_string()
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/lumina.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Share maintenance configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ShareConfig {
    /// Seconds between expired-share sweeps.
    #[serde(default = "default_reap_interval")]
    pub reap_interval_secs: u64,
    /// Whether the sweep runs at all.
    #[serde(default = "default_reaper_enabled")]
    pub reaper_enabled: bool,
}

fn default_reap_interval() -> u64 {
    DEFAULT_REAP_INTERVAL_SECS
}

fn default_reaper_enabled() -> bool {
    true
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            reap_interval_secs: default_reap_interval(),
            reaper_enabled: default_reaper_enabled(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Share maintenance configuration.
    #[serde(default)]
    pub shares: ShareConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(LuminaError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| LuminaError::Config(format!("config parse error: {e}")))
    }

    /// Apply `LUMINA_*` environment variables on top of the file values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup. Empty values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_DATABASE_PATH).filter(|v| !v.is_empty()) {
            self.database.path = path;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|v| !v.is_empty()) {
            self.logging.level = level;
        }
    }

    /// Reject values the runtime cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.database.max_connections == 0 {
            return Err(LuminaError::Config(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.shares.reap_interval_secs == 0 {
            return Err(LuminaError::Config(
                "shares.reap_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

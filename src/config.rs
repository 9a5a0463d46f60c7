//! Engine configuration.
//!
//! ## Environment
//!
//! - `VERSIONED_SYMBOLS_TRUNK`: name of the default branch (default: `master`)
//! - `VERSIONED_SYMBOLS_HISTORY_LIMIT`: node limit per history arena
//! - `LOG_FORMAT`: `json` or `pretty` (default: `pretty`)
//! - `RUST_LOG`: tracing filter directives (default: `info`)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::canonical::canonical_hash_hex;
use crate::history::History;

/// Environment variable naming the trunk branch.
pub const TRUNK_ENV: &str = "VERSIONED_SYMBOLS_TRUNK";
/// Environment variable bounding history arenas.
pub const HISTORY_LIMIT_ENV: &str = "VERSIONED_SYMBOLS_HISTORY_LIMIT";
/// Environment variable selecting the log format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
/// Environment variable holding log filter directives.
pub const LOG_FILTER_ENV: &str = "RUST_LOG";

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The trunk branch name is empty.
    #[error("Trunk branch name must not be empty")]
    EmptyTrunk,
    /// The history limit is zero or beyond the arena ceiling.
    #[error("History limit {limit} outside 1..={max}")]
    HistoryLimit {
        /// The configured limit.
        limit: u32,
        /// Largest supported limit.
        max: u32,
    },
    /// A log format string was not recognized.
    #[error("Unknown log format: {0}")]
    UnknownLogFormat(String),
}

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output for development.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::UnknownLogFormat(other.to_string())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => f.write_str("pretty"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Output format.
    pub format: LogFormat,
    /// `EnvFilter` directives.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: "info".to_string(),
        }
    }
}

/// Configuration of a [`Tree`](crate::tree::Tree).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Name of the branch default lookups resolve against.
    pub trunk: String,
    /// Maximum nodes per history arena.
    pub history_limit: u32,
    /// Logging.
    pub log: LogConfig,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            trunk: "master".to_string(),
            history_limit: History::<()>::MAX_NODES,
            log: LogConfig::default(),
        }
    }
}

impl TreeConfig {
    /// Build a configuration from the environment, falling back to defaults
    /// for unset or unparsable variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(trunk) = lookup(TRUNK_ENV) {
            config.trunk = trunk;
        }
        if let Some(raw) = lookup(HISTORY_LIMIT_ENV) {
            match raw.trim().parse::<u32>() {
                Ok(limit) => config.history_limit = limit,
                Err(error) => tracing::warn!(
                    variable = HISTORY_LIMIT_ENV,
                    value = %raw,
                    error = %error,
                    "Ignoring unparsable history limit"
                ),
            }
        }
        if let Some(raw) = lookup(LOG_FORMAT_ENV) {
            match raw.parse() {
                Ok(format) => config.log.format = format,
                Err(error) => tracing::warn!(
                    variable = LOG_FORMAT_ENV,
                    error = %error,
                    "Falling back to pretty logs"
                ),
            }
        }
        if let Some(filter) = lookup(LOG_FILTER_ENV) {
            config.log.filter = filter;
        }
        config
    }

    /// Check the configuration for values the engine cannot honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trunk.trim().is_empty() {
            return Err(ConfigError::EmptyTrunk);
        }
        let max = History::<()>::MAX_NODES;
        if self.history_limit == 0 || self.history_limit > max {
            return Err(ConfigError::HistoryLimit {
                limit: self.history_limit,
                max,
            });
        }
        Ok(())
    }

    /// Digest of the settings that affect stored data.
    ///
    /// Logging settings are excluded.
    pub fn config_hash(&self) -> String {
        canonical_hash_hex(&(&self.trunk, self.history_limit))
    }
}

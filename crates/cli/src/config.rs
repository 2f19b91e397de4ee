//! Configuration file for `dw`
//!
//! Loaded from `<config dir>/dirwatch/config.toml` unless `--config` names
//! another file. A missing default file means defaults; a missing explicit
//! file is an error. Command-line flags override file values.

use dirwatch::{KindSet, LogicalKind};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::filter::LevelFilter;

/// Errors loading or validating the config file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine the platform config directory")]
    NoConfigDir,

    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub watch: WatchConfig,
    pub log: LogConfig,
}

/// `[watch]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Event kinds to report
    pub events: Vec<LogicalKind>,
    /// Detach the dispatch thread
    pub daemon: bool,
    /// Rescan the directory when the OS reports lost events
    pub rescan_on_overflow: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            events: LogicalKind::ALL.to_vec(),
            daemon: true,
            rescan_on_overflow: true,
        }
    }
}

/// `[log]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// trace, debug, info, warn, error or off; `RUST_LOG` takes precedence
    pub level: String,
    /// Log to this file instead of stderr
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// Annotated example file; parses to the defaults
    pub const EXAMPLE: &'static str = r#"# dirwatch configuration

[watch]
# Event kinds to report: create, modify, delete
events = ["create", "modify", "delete"]
# Detach the dispatch thread from the process lifetime
daemon = true
# Rescan the directory when the OS reports lost events
rescan_on_overflow = true

[log]
# trace, debug, info, warn, error or off (RUST_LOG takes precedence)
level = "warn"
# Write logs to a file instead of stderr
# file = "/tmp/dirwatch.log"
"#;

    /// Default config file location
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("dirwatch").join("config.toml"))
    }

    /// File that `load(explicit)` reads
    pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
        match explicit {
            Some(path) => Ok(path.to_path_buf()),
            None => Self::default_path(),
        }
    }

    /// Load and validate the config
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_path(explicit)?;

        let config = match fs::read_to_string(&path) {
            Ok(text) => Self::from_toml(&text).map_err(|e| match e {
                ConfigError::Parse { source, .. } => ConfigError::Parse {
                    path: path.clone(),
                    source,
                },
                other => other,
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound && explicit.is_none() => {
                debug!("No config file at {}, using defaults", path.display());
                Self::default()
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse TOML text without validating
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.watch.events.is_empty() {
            return Err(ConfigError::Invalid(
                "watch.events must name at least one event kind".to_string(),
            ));
        }
        if self.log.level.parse::<LevelFilter>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "log.level '{}' is not one of trace, debug, info, warn, error, off",
                self.log.level
            )));
        }
        Ok(())
    }

    /// Requested kinds as a set
    pub fn kinds(&self) -> KindSet {
        self.watch.events.iter().copied().collect()
    }
}

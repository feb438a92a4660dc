//! Runtime configuration for parcelbook core.
//!
//! # Responsibility
//! - Deserialize `[database]` and `[logging]` sections from TOML.
//! - Apply `PARCELBOOK_*` environment overrides on top of file values.
//!
//! # Invariants
//! - Every field has a default, so an empty document is a valid config.
//! - A loaded config has already passed `validate()`.

use crate::logging::{default_log_level, normalize_level};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const DEFAULT_DB_FILE_NAME: &str = "parcelbook.sqlite3";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

pub const ENV_DB_PATH: &str = "PARCELBOOK_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "PARCELBOOK_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "PARCELBOOK_LOG_DIR";

/// Errors raised while loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file could not be read.
    Io { path: PathBuf, source: std::io::Error },
    /// Config document is not valid TOML for the expected shape.
    Parse(toml::de::Error),
    /// A field parsed but holds an unusable value.
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config: {err}"),
            Self::Invalid { field, message } => write!(f, "invalid config `{field}`: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid { .. } => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

/// Storage settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// SQLite database file.
    pub path: PathBuf,
    /// How long a writer waits for the database lock, in milliseconds.
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

/// Logging settings. File logging is disabled while `dir` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            dir: None,
        }
    }
}

/// Top-level core configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

impl CoreConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file, then applies environment
    /// overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&source)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Applies `PARCELBOOK_*` process environment overrides.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides resolved by `lookup`, then re-validates.
    ///
    /// Blank values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let resolve = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(path) = resolve(ENV_DB_PATH) {
            self.database.path = PathBuf::from(path.trim());
        }
        if let Some(level) = resolve(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
        if let Some(dir) = resolve(ENV_LOG_DIR) {
            self.logging.dir = Some(PathBuf::from(dir.trim()));
        }
        self.validate()
    }

    /// Checks value-level constraints serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                field: "database.path",
                message: "must not be empty".to_string(),
            });
        }
        if self.database.busy_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "database.busy_timeout_ms",
                message: "must be greater than zero".to_string(),
            });
        }
        normalize_level(&self.logging.level).map_err(|message| ConfigError::Invalid {
            field: "logging.level",
            message,
        })?;
        Ok(())
    }
}

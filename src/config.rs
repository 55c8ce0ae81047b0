//! Configuration for a logger instance

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{LogError, Result};
use crate::logging::LogLevel;

/// Environment variable overriding the configured level
pub const LEVEL_ENV_VAR: &str = "MINIMAL_LOG_LEVEL";

/// Placeholders accepted by the line template
pub const TEMPLATE_PLACEHOLDERS: &[&str] =
    &["{time}", "{level}", "{logger}", "{file}", "{line}", "{message}"];

/// How an existing log file is treated when the logger opens it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileMode {
    /// Keep existing content and add to the end
    #[default]
    Append,
    /// Truncate the file on open
    Overwrite,
}

/// Logger configuration, owned by a single logger instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log file the logger writes to (default: event.log)
    #[serde(default = "default_file_path")]
    pub file_path: PathBuf,

    /// Line template, see [`TEMPLATE_PLACEHOLDERS`]
    #[serde(default = "default_template")]
    pub template: String,

    /// strftime-style format for `{time}`
    #[serde(default = "default_time_format")]
    pub time_format: String,

    /// Least severe level written
    #[serde(default)]
    pub level: LogLevel,

    /// Append to or overwrite an existing log file
    #[serde(default)]
    pub file_mode: FileMode,

    /// Extension matched by cleanup, with or without the leading dot
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Also print every emitted line to stdout
    #[serde(default = "default_echo")]
    pub echo_to_console: bool,

    /// Number of recent entries kept in memory
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

}

fn default_file_path() -> PathBuf {
    PathBuf::from("event.log")
}

fn default_template() -> String {
    "{time} : {level} : {logger} : {file} : {line} : {message}".to_string()
}

fn default_time_format() -> String {
    "%Y-%m-%d, %H:%M:%S".to_string()
}

fn default_extension() -> String {
    "log".to_string()
}

fn default_echo() -> bool {
    true
}

fn default_buffer_capacity() -> usize {
    1_000
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file_path: default_file_path(),
            template: default_template(),
            time_format: default_time_format(),
            level: LogLevel::default(),
            file_mode: FileMode::default(),
            extension: default_extension(),
            echo_to_console: default_echo(),
            buffer_capacity: default_buffer_capacity(),
        }
    }
}

impl LogConfig {
    /// Load configuration from the default location, or return defaults if not found
    pub fn load() -> Result<Self> {
        match config_file_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default().with_env_overrides()),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LogError::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_toml(&content)?;
        Ok(config.with_env_overrides())
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| LogError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| LogError::Config(e.to_string()))
    }

    /// Reject configurations the logger cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.file_path.as_os_str().is_empty() {
            return Err(LogError::Config("file_path must not be empty".into()));
        }
        if !self.template.contains("{message}") {
            return Err(LogError::Config(
                "template must contain the {message} placeholder".into(),
            ));
        }
        if StrftimeItems::new(&self.time_format).any(|item| matches!(item, Item::Error)) {
            return Err(LogError::Config(format!(
                "invalid time_format '{}'",
                self.time_format
            )));
        }
        if self.extension.trim_start_matches('.').is_empty() {
            return Err(LogError::Config("extension must not be empty".into()));
        }
        Ok(())
    }

    /// Apply `MINIMAL_LOG_LEVEL` if set to a valid level
    ///
    /// An invalid value is reported on stderr and the configured level kept.
    pub fn with_env_overrides(mut self) -> Self {
        let value = std::env::var(LEVEL_ENV_VAR).ok();
        match parse_level_override(value.as_deref()) {
            Ok(Some(level)) => self.level = level,
            Ok(None) => {}
            Err(e) => e.report(&format!("reading {}", LEVEL_ENV_VAR)),
        }
        self
    }

    /// Builder-style override of the log file path
    pub fn with_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = path.into();
        self
    }

    /// Builder-style override of the file mode
    pub fn with_file_mode(mut self, mode: FileMode) -> Self {
        self.file_mode = mode;
        self
    }

    /// Builder-style override of the level
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Builder-style toggle of console echo
    pub fn with_console_echo(mut self, echo: bool) -> Self {
        self.echo_to_console = echo;
        self
    }
}

/// Level named by an override value, `None` when unset or blank
pub fn parse_level_override(value: Option<&str>) -> Result<Option<LogLevel>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some),
    }
}

/// Base configuration directory (~/.minimal-log), if a home directory exists
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".minimal-log"))
}

/// Path to the default config file
pub fn config_file_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

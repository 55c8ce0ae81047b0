//! Error type shared by every fallible operation in the crate

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, LogError>;

/// Failure kinds, each carrying enough detail to print one diagnostic line
#[derive(Debug, Error)]
pub enum LogError {
    /// Configuration could not be read or parsed
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The log file could not be opened or created
    #[error("failed to open log file {}: {source}", path.display())]
    OpenLogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A directory could not be read while scanning for log files
    #[error("failed to scan {}: {source}", path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A single file could not be deleted during cleanup
    #[error("failed to delete {}: {source}", path.display())]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The call stack could not be captured
    #[error("call stack unavailable: {0}")]
    StackCapture(String),

    /// A level name did not match any known level
    #[error("unknown log level '{0}'")]
    InvalidLevel(String),
}

impl LogError {
    /// Short machine-friendly name of the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            LogError::Config(_) => "config",
            LogError::OpenLogFile { .. } => "open",
            LogError::Scan { .. } => "scan",
            LogError::Delete { .. } => "delete",
            LogError::StackCapture(_) => "stack",
            LogError::InvalidLevel(_) => "level",
        }
    }

    /// Print the error to stderr, the fallback channel when logging itself is unusable
    pub fn report(&self, context: &str) {
        eprintln!("error {}: {}", context, self);
    }
}

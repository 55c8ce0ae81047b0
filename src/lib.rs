//! minimal-log - a small file logger
//!
//! Wraps a tracing backend with a default log file, a line template,
//! announcements, call-stack dumps on error-level events, and cleanup of
//! log files in a directory tree.

pub mod config;
pub mod error;
pub mod event;
pub mod logger;
pub mod logging;
pub mod stack;

pub use config::{FileMode, LogConfig};
pub use error::{LogError, Result};
pub use event::LogEvent;
pub use logger::MinimalLog;
pub use logging::LogLevel;
pub use stack::{BacktraceProvider, FixedStack, StackFilter, StackProvider};

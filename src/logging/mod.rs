//! Logging backend for minimal-log
//!
//! Provides the file sink with its line template, the in-memory buffer of
//! recent entries, log levels, and cleanup of old log files.

mod buffer;
mod cleanup;
mod file_writer;
mod level;

pub use buffer::{LogBuffer, LogEntry};
pub use cleanup::{
    clean_up, clean_up_in, delete_files, find_log_files, normalize_extension, CleanupOptions,
    CleanupReport, LogScan,
};
pub use file_writer::{
    build_dispatch, open_log_file, render_template, LineParts, CALLER_FILE_FIELD,
    CALLER_LINE_FIELD,
};
pub use level::LogLevel;

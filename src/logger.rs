//! The logger itself
//!
//! `MinimalLog` owns its configuration, an instance-local tracing dispatcher
//! and a stack filter. Logging calls never fail from the caller's point of
//! view: backend problems are reported once on stderr and the logger keeps
//! going in whatever state it can.

use std::fmt::Display;
use std::panic::Location;
use std::path::Path;
use std::sync::Arc;

use crate::config::LogConfig;
use crate::error::Result;
use crate::event::{announce, with_prefix, LogEvent};
use crate::logging::{self, CleanupOptions, CleanupReport, LogBuffer, LogEntry, LogLevel};
use crate::stack::StackFilter;

/// Name used when no logger name is given
pub const ROOT_LOGGER: &str = "root";

/// A file logger with announcements and call-stack dumps
pub struct MinimalLog {
    name: String,
    config: LogConfig,
    dispatch: tracing::Dispatch,
    buffer: Arc<LogBuffer>,
    stack: StackFilter,
    degraded: bool,
}

impl std::fmt::Debug for MinimalLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MinimalLog")
            .field("name", &self.name)
            .field("log_path", &self.config.file_path)
            .field("degraded", &self.degraded)
            .finish()
    }
}

impl MinimalLog {
    /// Create a logger, returning the error if the log file cannot be set up
    ///
    /// `None` gives the root logger.
    pub fn try_new(name: Option<&str>, config: LogConfig) -> Result<Self> {
        Self::try_with_stack(name, config, StackFilter::default())
    }

    /// Like [`MinimalLog::try_new`] with a custom stack filter
    pub fn try_with_stack(name: Option<&str>, config: LogConfig, stack: StackFilter) -> Result<Self> {
        config.validate()?;
        let file = logging::open_log_file(&config.file_path, config.file_mode)?;
        Ok(Self::assemble(logger_name(name), config, Some(file), stack))
    }

    /// Create a logger, falling back to a degraded one on setup failure
    ///
    /// A degraded logger writes no file; it still echoes to the console (when
    /// configured) and records entries in memory.
    pub fn new(name: Option<&str>, config: LogConfig) -> Self {
        Self::with_stack(name, config, StackFilter::default())
    }

    /// Like [`MinimalLog::new`] with a custom stack filter
    pub fn with_stack(name: Option<&str>, config: LogConfig, stack: StackFilter) -> Self {
        let name = logger_name(name);
        let opened = config
            .validate()
            .and_then(|_| logging::open_log_file(&config.file_path, config.file_mode));

        match opened {
            Ok(file) => Self::assemble(name, config, Some(file), stack),
            Err(e) => {
                e.report(&format!("initializing logger '{}'", name));
                let config = if config.validate().is_ok() {
                    config
                } else {
                    LogConfig::default()
                        .with_file_path(config.file_path.clone())
                        .with_console_echo(config.echo_to_console)
                };
                let mut logger = Self::assemble(name, config, None, stack);
                logger.degraded = true;
                logger
            }
        }
    }

    /// Root logger with the default configuration
    pub fn root() -> Self {
        Self::new(None, LogConfig::default())
    }

    fn assemble(
        name: String,
        config: LogConfig,
        file: Option<std::fs::File>,
        stack: StackFilter,
    ) -> Self {
        let buffer = Arc::new(LogBuffer::new(config.buffer_capacity));
        let dispatch = logging::build_dispatch(&config, &name, file, Arc::clone(&buffer));
        Self {
            name,
            config,
            dispatch,
            buffer,
            stack,
            degraded: false,
        }
    }

    /// Log an event
    ///
    /// The primary message is emitted first. Error-level events, and events
    /// that ask for it, are followed by the call chain and a rendered trace
    /// of the callers above the logger. Every emitted message carries the
    /// completion prefix and, for announcements, a border.
    #[track_caller]
    pub fn log_event(&self, event: impl Into<LogEvent>) {
        let event = event.into();
        let caller = Location::caller();
        for message in self.compose(&event) {
            self.emit(event.level, &message, caller);
        }
    }

    /// Log at info level
    #[track_caller]
    pub fn info(&self, message: impl Display) {
        self.log_event(LogEvent::info(message));
    }

    /// Log at debug level, dropped unless the configured level allows it
    #[track_caller]
    pub fn debug(&self, message: impl Display) {
        self.log_event(LogEvent::debug(message));
    }

    /// Log at warning level
    #[track_caller]
    pub fn warning(&self, message: impl Display) {
        self.log_event(LogEvent::warning(message));
    }

    /// Log at error level, which always attaches the call stack
    #[track_caller]
    pub fn error(&self, message: impl Display) {
        self.log_event(LogEvent::error(message));
    }

    /// Same as [`MinimalLog::info`], kept for callers that name the event kind
    #[track_caller]
    pub fn log_info_event(&self, message: impl Display) {
        self.info(message);
    }

    /// Log an info-level announcement
    #[track_caller]
    pub fn announce(&self, message: impl Display) {
        self.log_event(LogEvent::info(message).announce());
    }

    fn compose(&self, event: &LogEvent) -> Vec<String> {
        let mut messages = vec![event.message.clone()];

        if event.wants_call_stack() {
            match self.stack.diagnose() {
                Ok(Some(diagnosis)) => {
                    messages.push(diagnosis.chain);
                    messages.push(diagnosis.trace);
                }
                Ok(None) => {}
                Err(e) => e.report("capturing call stack"),
            }
        }

        messages
            .iter()
            .map(|message| {
                let message = with_prefix(message, event.completed);
                if event.announcement {
                    announce(&message)
                } else {
                    message
                }
            })
            .collect()
    }

    fn emit(&self, level: LogLevel, message: &str, caller: &Location<'_>) {
        let file = caller.file();
        let line = caller.line();
        tracing::dispatcher::with_default(&self.dispatch, || match level {
            LogLevel::Debug => {
                tracing::debug!(caller_file = file, caller_line = line, "{}", message)
            }
            LogLevel::Info => tracing::info!(caller_file = file, caller_line = line, "{}", message),
            LogLevel::Warning => {
                tracing::warn!(caller_file = file, caller_line = line, "{}", message)
            }
            LogLevel::Error => {
                tracing::error!(caller_file = file, caller_line = line, "{}", message)
            }
        });
    }

    /// Delete log files with the configured extension below the working directory
    ///
    /// Files that could not be deleted and directories that could not be read
    /// are logged as warnings through this logger before the report returns.
    pub fn clean_up(&self) -> Result<CleanupReport> {
        let report = logging::clean_up(&self.cleanup_options())?;
        self.log_cleanup_problems(&report);
        Ok(report)
    }

    /// Delete log files with the configured extension below `root`
    pub fn clean_up_in(&self, root: &Path) -> Result<CleanupReport> {
        let report = logging::clean_up_in(root, &self.cleanup_options())?;
        self.log_cleanup_problems(&report);
        Ok(report)
    }

    fn log_cleanup_problems(&self, report: &CleanupReport) {
        for problem in report.problems() {
            self.warning(format_args!("cleanup skipped: {}", problem));
        }
    }

    fn cleanup_options(&self) -> CleanupOptions {
        CleanupOptions::new(self.config.extension.clone())
    }

    /// Logger name, `root` when none was given
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configuration the logger was built with
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Path of the log file, whether or not it could be opened
    pub fn log_path(&self) -> &Path {
        &self.config.file_path
    }

    /// Whether setup failed and the logger writes no file
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Recently emitted entries, oldest first
    pub fn recent(&self) -> Vec<LogEntry> {
        self.buffer.all_entries()
    }
}

fn logger_name(name: Option<&str>) -> String {
    name.unwrap_or(ROOT_LOGGER).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileMode;
    use crate::stack::FixedStack;
    use tempfile::TempDir;

    fn quiet_config(dir: &TempDir) -> LogConfig {
        LogConfig::default()
            .with_file_path(dir.path().join("event.log"))
            .with_console_echo(false)
    }

    fn logger_with_stack(dir: &TempDir, frames: &[&str]) -> MinimalLog {
        let stack = StackFilter::new(FixedStack::new(frames.iter().copied()));
        MinimalLog::try_with_stack(Some("unit"), quiet_config(dir), stack).unwrap()
    }

    #[test]
    fn test_root_logger_name() {
        let dir = TempDir::new().unwrap();
        let logger = MinimalLog::try_new(None, quiet_config(&dir)).unwrap();
        assert_eq!(logger.name(), ROOT_LOGGER);
        assert!(!logger.is_degraded());
    }

    #[test]
    fn test_completion_prefixes() {
        let dir = TempDir::new().unwrap();
        let logger = logger_with_stack(&dir, &[]);

        logger.log_event(LogEvent::info("done").completed(true));
        logger.log_event(LogEvent::info("trying").completed(false));
        logger.log_event(LogEvent::info("plain"));

        let messages: Vec<String> = logger.recent().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["success : done", "attempt : trying", "plain"]);
    }

    #[test]
    fn test_error_attaches_trace() {
        let dir = TempDir::new().unwrap();
        let logger = logger_with_stack(
            &dir,
            &["emit", "log_event", "write_report", "<module>", "run_job", "main"],
        );

        logger.error("write failed");

        let messages: Vec<String> = logger.recent().into_iter().map(|e| e.message).collect();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], "write failed");
        assert_eq!(messages[1], "main > run_job > write_report");
        assert_eq!(
            messages[2],
            "\n\t\tdumping call stack for main\n\t\t\t\trun_job\n\t\t\t\twrite_report"
        );
        assert!(logger.recent().iter().all(|e| e.level == LogLevel::Error));
    }

    #[test]
    fn test_info_has_no_trace_unless_requested() {
        let dir = TempDir::new().unwrap();
        let logger = logger_with_stack(&dir, &["emit", "log_event", "caller"]);

        logger.info("quiet");
        assert_eq!(logger.recent().len(), 1);

        logger.log_event(LogEvent::info("loud").dump_call_stack());
        assert_eq!(logger.recent().len(), 4);
    }

    #[test]
    fn test_announcement_wraps_every_message() {
        let dir = TempDir::new().unwrap();
        let logger = logger_with_stack(&dir, &["emit", "log_event", "caller"]);

        logger.log_event(LogEvent::error("boom").announce().completed(false));

        for entry in logger.recent() {
            assert!(entry.message.starts_with("\n*"), "{:?}", entry.message);
            assert!(entry.message.contains("attempt : "));
        }
    }

    #[test]
    fn test_level_filter_applies() {
        let dir = TempDir::new().unwrap();
        let logger = logger_with_stack(&dir, &[]);

        logger.debug("hidden");
        logger.warning("shown");

        let entries = logger.recent();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, LogLevel::Warning);
    }

    #[test]
    fn test_file_records_caller_location() {
        let dir = TempDir::new().unwrap();
        let logger = logger_with_stack(&dir, &[]);

        logger.info("located");

        let content = std::fs::read_to_string(logger.log_path()).unwrap();
        assert!(content.contains(" : INFO : unit : "));
        assert!(content.contains("logger.rs"));
        assert!(content.trim_end().ends_with(" : located"));
    }

    #[test]
    fn test_overwrite_mode_truncates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("event.log");
        std::fs::write(&path, "stale line\n").unwrap();

        let config = quiet_config(&dir).with_file_mode(FileMode::Overwrite);
        let logger = MinimalLog::try_new(None, config).unwrap();
        logger.info("fresh");

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("stale line"));
        assert!(content.contains("fresh"));
    }

    #[test]
    fn test_degraded_logger_keeps_buffering() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file").unwrap();
        let config = LogConfig::default()
            .with_file_path(blocker.join("event.log"))
            .with_console_echo(false);

        assert!(MinimalLog::try_new(None, config.clone()).is_err());

        let logger = MinimalLog::new(None, config);
        assert!(logger.is_degraded());
        logger.info("still recorded");
        assert_eq!(logger.recent().len(), 1);
    }

    #[test]
    fn test_clean_up_logs_failures_through_own_sink() {
        let dir = TempDir::new().unwrap();
        let logger = logger_with_stack(&dir, &[]);
        let tree = TempDir::new().unwrap();
        std::fs::write(tree.path().join("old.log"), "old").unwrap();
        std::fs::create_dir(tree.path().join("stubborn.log")).unwrap();

        let report = logger.clean_up_in(tree.path()).unwrap();

        assert_eq!(report.deleted_count(), 1);
        assert_eq!(report.failed.len(), 1);
        let warnings: Vec<LogEntry> = logger
            .recent()
            .into_iter()
            .filter(|e| e.level == LogLevel::Warning)
            .collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("failed to delete"));
        assert!(warnings[0].message.contains("stubborn.log"));

        let content = std::fs::read_to_string(logger.log_path()).unwrap();
        assert!(content.contains(" : WARNING : unit : "));
    }

    #[test]
    fn test_capture_failure_still_logs_event() {
        struct Broken;
        impl crate::stack::StackProvider for Broken {
            fn capture(&self) -> Result<crate::stack::CallStack> {
                Err(crate::error::LogError::StackCapture("unavailable".into()))
            }
        }

        let dir = TempDir::new().unwrap();
        let logger =
            MinimalLog::try_with_stack(None, quiet_config(&dir), StackFilter::new(Broken)).unwrap();
        logger.error("primary");

        let entries = logger.recent();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "primary");
    }

    #[test]
    fn test_clean_up_in_uses_configured_extension() {
        let dir = TempDir::new().unwrap();
        let logs = TempDir::new().unwrap();
        std::fs::write(logs.path().join("a.trace"), "x").unwrap();
        std::fs::write(logs.path().join("b.log"), "x").unwrap();

        let mut config = quiet_config(&dir);
        config.extension = ".trace".to_string();
        let logger = MinimalLog::try_new(None, config).unwrap();

        let report = logger.clean_up_in(logs.path()).unwrap();
        assert_eq!(report.deleted, vec![logs.path().join("a.trace")]);
        assert!(logs.path().join("b.log").exists());
    }
}

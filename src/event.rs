//! Log events and their message decorations

use std::fmt::Display;

use crate::logging::LogLevel;

/// Prefix for events that report a completed operation
pub const SUCCESS_PREFIX: &str = "success : ";
/// Prefix for events that report an attempted operation
pub const ATTEMPT_PREFIX: &str = "attempt : ";

const BORDER_CHAR: char = '*';
const BORDER_PADDING: usize = 4;

/// A single request to the logger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub message: String,
    /// `Some(true)` completed, `Some(false)` attempted, `None` neither
    pub completed: Option<bool>,
    pub level: LogLevel,
    /// Wrap each emitted message in a border
    pub announcement: bool,
    /// Attach the caller's stack even below error level
    pub dump_call_stack: bool,
}

impl LogEvent {
    /// Event at info level; any displayable value is accepted as the message
    pub fn new(message: impl Display) -> Self {
        Self {
            message: message.to_string(),
            completed: None,
            level: LogLevel::Info,
            announcement: false,
            dump_call_stack: false,
        }
    }

    pub fn info(message: impl Display) -> Self {
        Self::new(message)
    }

    pub fn debug(message: impl Display) -> Self {
        Self::new(message).level(LogLevel::Debug)
    }

    pub fn warning(message: impl Display) -> Self {
        Self::new(message).level(LogLevel::Warning)
    }

    pub fn error(message: impl Display) -> Self {
        Self::new(message).level(LogLevel::Error)
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn completed(mut self, completed: impl Into<Option<bool>>) -> Self {
        self.completed = completed.into();
        self
    }

    pub fn announce(mut self) -> Self {
        self.announcement = true;
        self
    }

    pub fn dump_call_stack(mut self) -> Self {
        self.dump_call_stack = true;
        self
    }

    /// Whether a stack trace should accompany this event
    ///
    /// Error-level events always carry one.
    pub fn wants_call_stack(&self) -> bool {
        self.dump_call_stack || self.level == LogLevel::Error
    }
}

impl<T: Display> From<T> for LogEvent {
    fn from(message: T) -> Self {
        LogEvent::new(message)
    }
}

/// Prefix reflecting the completion state of an event
pub fn completion_prefix(completed: Option<bool>) -> &'static str {
    match completed {
        Some(true) => SUCCESS_PREFIX,
        Some(false) => ATTEMPT_PREFIX,
        None => "",
    }
}

/// Apply the completion prefix to a message
pub fn with_prefix(message: &str, completed: Option<bool>) -> String {
    format!("{}{}", completion_prefix(completed), message)
}

/// Surround a message with a border so it stands out in the log
pub fn announce(message: &str) -> String {
    let width = message
        .lines()
        .map(|line| line.replace('\t', "    ").chars().count())
        .max()
        .unwrap_or(0)
        + BORDER_PADDING * 2;
    let border: String = std::iter::repeat(BORDER_CHAR).take(width).collect();
    let pad = " ".repeat(BORDER_PADDING);

    let mut block = format!("\n{}", border);
    for line in message.lines() {
        block.push('\n');
        block.push_str(&pad);
        block.push_str(line);
    }
    block.push('\n');
    block.push_str(&border);
    block
}

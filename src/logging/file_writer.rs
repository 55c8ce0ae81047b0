//! File-based log sink with tracing integration
//!
//! Builds an instance-local tracing dispatcher: a level filter, an `fmt`
//! layer that renders the configured line template into the log file (and
//! optionally stdout), and a layer that mirrors every event into the
//! [`LogBuffer`].

use std::fmt::{self, Write as _};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::Local;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use super::buffer::{LogBuffer, LogEntry};
use super::level::LogLevel;
use crate::config::{FileMode, LogConfig};
use crate::error::{LogError, Result};

/// Field carrying the caller's source file
pub const CALLER_FILE_FIELD: &str = "caller_file";
/// Field carrying the caller's source line
pub const CALLER_LINE_FIELD: &str = "caller_line";

/// Open the log file honouring the configured mode
pub fn open_log_file(path: &Path, mode: FileMode) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| LogError::OpenLogFile {
            path: path.to_path_buf(),
            source,
        })?;
    }

    let mut options = OpenOptions::new();
    options.create(true);
    match mode {
        FileMode::Append => options.append(true),
        FileMode::Overwrite => options.write(true).truncate(true),
    };
    options.open(path).map_err(|source| LogError::OpenLogFile {
        path: path.to_path_buf(),
        source,
    })
}

/// A writer that writes to the log file and, optionally, stdout
pub struct TeeWriter {
    file: Option<Arc<Mutex<File>>>,
    echo: bool,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                // A failed write must never reach the caller of the logger
                if let Err(e) = file.write_all(buf).and_then(|_| file.flush()) {
                    eprintln!("error writing log file: {}", e);
                }
            }
        }

        if self.echo {
            let _ = std::io::stdout().write_all(buf);
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                return file.flush();
            }
        }
        Ok(())
    }
}

/// Writer factory for tracing-subscriber
#[derive(Clone)]
pub struct TeeWriterMaker {
    file: Option<Arc<Mutex<File>>>,
    echo: bool,
}

impl TeeWriterMaker {
    pub fn new(file: Option<File>, echo: bool) -> Self {
        Self {
            file: file.map(|f| Arc::new(Mutex::new(f))),
            echo,
        }
    }
}

impl<'a> MakeWriter<'a> for TeeWriterMaker {
    type Writer = TeeWriter;

    fn make_writer(&'a self) -> Self::Writer {
        TeeWriter {
            file: self.file.clone(),
            echo: self.echo,
        }
    }
}

/// Message and caller location pulled out of an event
#[derive(Debug, Default)]
struct EventFields {
    message: String,
    file: Option<String>,
    line: Option<u64>,
}

impl Visit for EventFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = value.to_string(),
            CALLER_FILE_FIELD => self.file = Some(value.to_string()),
            _ => {}
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        if field.name() == CALLER_LINE_FIELD {
            self.line = Some(value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            "message" => self.message = format!("{:?}", value),
            CALLER_FILE_FIELD => self.file = Some(format!("{:?}", value)),
            CALLER_LINE_FIELD => self.line = format!("{:?}", value).parse().ok(),
            _ => {}
        }
    }
}

impl EventFields {
    fn from_event(event: &Event<'_>) -> Self {
        let mut fields = Self::default();
        event.record(&mut fields);
        fields
    }
}

/// Values substituted into a line template
#[derive(Debug, Clone, Copy)]
pub struct LineParts<'a> {
    pub time: &'a str,
    pub level: &'a str,
    pub logger: &'a str,
    pub file: &'a str,
    pub line: &'a str,
    pub message: &'a str,
}

/// Substitute placeholders in one pass, leaving unknown ones verbatim
pub fn render_template(template: &str, parts: &LineParts<'_>) -> String {
    let mut out = String::with_capacity(template.len() + parts.message.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let Some(close) = tail.find('}') else {
            out.push_str(tail);
            return out;
        };

        let value = match &tail[1..close] {
            "time" => Some(parts.time),
            "level" => Some(parts.level),
            "logger" => Some(parts.logger),
            "file" => Some(parts.file),
            "line" => Some(parts.line),
            "message" => Some(parts.message),
            _ => None,
        };
        match value {
            Some(value) => out.push_str(value),
            None => out.push_str(&tail[..=close]),
        }
        rest = &tail[close + 1..];
    }

    out.push_str(rest);
    out
}

/// Event formatter rendering the configured line template
pub struct TemplateFormatter {
    template: String,
    time_format: String,
    logger: String,
}

impl TemplateFormatter {
    pub fn new(config: &LogConfig, logger: impl Into<String>) -> Self {
        Self {
            template: config.template.clone(),
            time_format: config.time_format.clone(),
            logger: logger.into(),
        }
    }
}

impl<S, N> FormatEvent<S, N> for TemplateFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        let fields = EventFields::from_event(event);

        let mut time = String::new();
        let _ = write!(time, "{}", Local::now().format(&self.time_format));

        let file = fields
            .file
            .or_else(|| metadata.file().map(str::to_string))
            .unwrap_or_default();
        let line = fields
            .line
            .or_else(|| metadata.line().map(u64::from))
            .map(|l| l.to_string())
            .unwrap_or_default();
        let level = LogLevel::from(*metadata.level());

        let parts = LineParts {
            time: &time,
            level: level.as_str(),
            logger: &self.logger,
            file: &file,
            line: &line,
            message: &fields.message,
        };
        writeln!(writer, "{}", render_template(&self.template, &parts))
    }
}

/// Layer that mirrors every enabled event into a [`LogBuffer`]
pub struct BufferLayer {
    buffer: Arc<LogBuffer>,
    logger: String,
}

impl BufferLayer {
    pub fn new(buffer: Arc<LogBuffer>, logger: impl Into<String>) -> Self {
        Self {
            buffer,
            logger: logger.into(),
        }
    }
}

impl<S: Subscriber> Layer<S> for BufferLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let fields = EventFields::from_event(event);
        self.buffer.push(LogEntry::new(
            LogLevel::from(*event.metadata().level()),
            self.logger.clone(),
            fields.message,
        ));
    }
}

/// Build the dispatcher a logger instance emits through
///
/// `file` is `None` for a degraded logger whose log file could not be opened.
pub fn build_dispatch(
    config: &LogConfig,
    logger: &str,
    file: Option<File>,
    buffer: Arc<LogBuffer>,
) -> tracing::Dispatch {
    let writer = TeeWriterMaker::new(file, config.echo_to_console);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .event_format(TemplateFormatter::new(config, logger));

    let subscriber = tracing_subscriber::registry()
        .with(config.level.to_filter())
        .with(file_layer)
        .with(BufferLayer::new(buffer, logger));

    tracing::Dispatch::new(subscriber)
}

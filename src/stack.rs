//! Call-stack capture and filtering for diagnostic log entries
//!
//! A raw stack is captured through a [`StackProvider`], frames belonging to
//! loader or runtime machinery are dropped, the logger's own frames are
//! skipped, and what is left is rendered as a short, tab-indented trace with
//! the outermost caller first.

use crate::error::{LogError, Result};

/// Loader-internal function names that never belong in a trace
pub const SYSTEM_FRAME_NAMES: &[&str] = &[
    "_call_with_frames_removed",
    "_exec",
    "exec_module",
    "execfile",
    "_find_and_load",
    "_find_and_load_unlocked",
    "_load_unlocked",
];

/// Number of innermost frames owned by the logging call itself
pub const LOGGER_FRAME_OFFSET: usize = 2;

/// Delimiter used for the one-line call chain
pub const CHAIN_DELIMITER: &str = " > ";

/// Path prefixes of frames that belong to the Rust runtime or the unwinder
const RUNTIME_PREFIXES: &[&str] = &["std::", "core::", "alloc::", "backtrace::", "test::"];

/// Traits whose impls are closure-call shims rather than user code
const CLOSURE_TRAIT_PREFIXES: &[&str] = &["core::ops::function::", "std::ops::function::"];

/// Path prefix of this crate's own frames
const OWN_PREFIX: &str = "minimal_log::";

/// A single entry in a captured call stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    /// Enclosing function name, if the symbol could be resolved
    pub name: Option<String>,
}

impl StackFrame {
    /// Frame with a known function name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }

    /// Frame whose symbol could not be resolved
    pub fn unnamed() -> Self {
        Self { name: None }
    }
}

/// Ordered frames, innermost (most recent) call first
pub type CallStack = Vec<StackFrame>;

/// Source of call stacks
pub trait StackProvider: Send + Sync {
    /// Capture the stack of the calling thread
    fn capture(&self) -> Result<CallStack>;

    /// How many innermost frames of a capture belong to the logger
    fn logger_frames(&self) -> usize {
        LOGGER_FRAME_OFFSET
    }
}

/// Production provider backed by the platform unwinder
///
/// Runtime frames and frames of this crate are removed at capture time, so
/// the stack it returns starts at the logger's caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct BacktraceProvider;

impl StackProvider for BacktraceProvider {
    fn capture(&self) -> Result<CallStack> {
        let trace = backtrace::Backtrace::new();
        let frames = trace.frames();
        if frames.is_empty() {
            return Err(LogError::StackCapture("unwinder returned no frames".into()));
        }

        let mut stack = Vec::with_capacity(frames.len());
        let mut resolved = false;
        for frame in frames {
            let symbols = frame.symbols();
            if symbols.is_empty() {
                stack.push(StackFrame::unnamed());
                continue;
            }
            // Inlined calls show up as several symbols on one frame
            for symbol in symbols {
                let name = symbol.name().map(|n| format!("{:#}", n));
                resolved |= name.is_some();
                if name.as_deref().map_or(false, is_runtime_frame) {
                    continue;
                }
                stack.push(StackFrame { name });
            }
        }

        if !resolved {
            return Err(LogError::StackCapture("no symbol information".into()));
        }
        Ok(stack)
    }

    fn logger_frames(&self) -> usize {
        0
    }
}

/// Provider returning a fixed, caller-supplied stack
#[derive(Debug, Default, Clone)]
pub struct FixedStack {
    frames: CallStack,
    logger_frames: usize,
}

impl FixedStack {
    /// Stack from names given innermost first, with the default logger offset
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            frames: names.into_iter().map(StackFrame::named).collect(),
            logger_frames: LOGGER_FRAME_OFFSET,
        }
    }

    /// Stack from prebuilt frames
    pub fn from_frames(frames: CallStack) -> Self {
        Self {
            frames,
            logger_frames: LOGGER_FRAME_OFFSET,
        }
    }

    /// Override how many innermost frames are treated as the logger's own
    pub fn with_logger_frames(mut self, count: usize) -> Self {
        self.logger_frames = count;
        self
    }
}

impl StackProvider for FixedStack {
    fn capture(&self) -> Result<CallStack> {
        Ok(self.frames.clone())
    }

    fn logger_frames(&self) -> usize {
        self.logger_frames
    }
}

/// Output of one diagnostic request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnosis {
    /// One-line chain, outermost caller first
    pub chain: String,
    /// Multi-line trace with a header
    pub trace: String,
}

/// Turns raw call stacks into readable diagnostics
pub struct StackFilter {
    provider: Box<dyn StackProvider>,
}

impl std::fmt::Debug for StackFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StackFilter").finish_non_exhaustive()
    }
}

impl Default for StackFilter {
    fn default() -> Self {
        Self::new(BacktraceProvider)
    }
}

impl StackFilter {
    /// Create a filter over the given provider
    pub fn new(provider: impl StackProvider + 'static) -> Self {
        Self {
            provider: Box::new(provider),
        }
    }

    /// Capture the current stack from this filter's provider
    pub fn capture_stack(&self) -> Result<CallStack> {
        capture_stack(self.provider.as_ref())
    }

    /// Capture, filter and render the stack above the logging call
    ///
    /// Returns `Ok(None)` when nothing is left once system and logger frames
    /// are gone.
    pub fn diagnose(&self) -> Result<Option<Diagnosis>> {
        let names = filter_stack(&self.capture_stack()?);
        let above = drop_innermost(&names, self.provider.logger_frames());
        if above.is_empty() {
            return Ok(None);
        }

        let chain = call_chain(&above);
        let mut readable = above;
        readable.reverse();
        Ok(Some(Diagnosis {
            chain,
            trace: render_trace(&readable),
        }))
    }
}

/// Capture the current stack from `provider`
pub fn capture_stack(provider: &dyn StackProvider) -> Result<CallStack> {
    provider.capture()
}

/// Whether a frame name belongs to loader or interpreter machinery
pub fn is_system_frame(name: Option<&str>) -> bool {
    match name {
        None => true,
        Some(name) => {
            SYSTEM_FRAME_NAMES.contains(&name) || name.ends_with("__") || name.ends_with('>')
        }
    }
}

/// Names of the frames that are not system frames, in capture order
pub fn filter_stack(stack: &[StackFrame]) -> Vec<String> {
    stack
        .iter()
        .filter(|frame| !is_system_frame(frame.name.as_deref()))
        .filter_map(|frame| frame.name.clone())
        .collect()
}

/// Names above the logger's own frames, using the fixed offset
pub fn above_logger(names: &[String]) -> Vec<String> {
    drop_innermost(names, LOGGER_FRAME_OFFSET)
}

fn drop_innermost(names: &[String], count: usize) -> Vec<String> {
    names.get(count..).map(<[String]>::to_vec).unwrap_or_default()
}

/// Reverse the segment order of a delimited string
pub fn reverse_segments(chain: &str, delimiter: &str) -> String {
    let mut segments: Vec<&str> = chain.split(delimiter).collect();
    segments.reverse();
    segments.join(delimiter)
}

/// One-line chain from capture-order names, outermost caller first
pub fn call_chain(names: &[String]) -> String {
    reverse_segments(&names.join(CHAIN_DELIMITER), CHAIN_DELIMITER)
}

/// Render names given outermost first as a header plus one line per caller
pub fn render_trace(names: &[String]) -> String {
    let Some((outermost, rest)) = names.split_first() else {
        return String::new();
    };

    let mut trace = format!("\n\t\tdumping call stack for {}", outermost);
    for name in rest {
        trace.push_str("\n\t\t\t\t");
        trace.push_str(name);
    }
    trace
}

/// Whether a resolved symbol belongs to the runtime, the test harness, the
/// unwinder or this crate rather than to the logger's caller
fn is_runtime_frame(name: &str) -> bool {
    // Demangled Rust functions always carry a path; bare names are C runtime
    // entry points such as `main`, `_start` or `start_thread`
    if !name.contains("::") {
        return true;
    }

    match split_qualified(name) {
        Some((self_ty, trait_path)) => {
            let closure_shim = trait_path
                .map_or(false, |t| CLOSURE_TRAIT_PREFIXES.iter().any(|p| t.starts_with(p)));
            closure_shim || is_runtime_path(strip_type_modifiers(self_ty))
        }
        None => is_runtime_path(name),
    }
}

fn is_runtime_path(path: &str) -> bool {
    RUNTIME_PREFIXES.iter().any(|p| path.starts_with(p)) || path.starts_with(OWN_PREFIX)
}

/// `&`, `&mut ` and `dyn ` in front of a qualified self type
fn strip_type_modifiers(mut ty: &str) -> &str {
    loop {
        let stripped = ty
            .trim_start_matches('&')
            .trim_start_matches("mut ")
            .trim_start_matches("dyn ");
        if stripped.len() == ty.len() {
            return ty;
        }
        ty = stripped;
    }
}

/// Split `<SelfTy as Trait>::method` (or `<SelfTy>::method`) into its self
/// type and optional trait path
fn split_qualified(name: &str) -> Option<(&str, Option<&str>)> {
    let inner = name.strip_prefix('<')?;
    let mut depth = 0usize;
    let mut prev = '\0';
    let mut split_at = None;

    for (i, c) in inner.char_indices() {
        match c {
            '<' => depth += 1,
            // `->` in `Fn() -> T` is not a closing bracket
            '>' if prev != '-' => {
                if depth == 0 {
                    let qualified = &inner[..i];
                    return Some(match split_at {
                        Some(at) => (&qualified[..at], Some(&qualified[at + 4..])),
                        None => (qualified, None),
                    });
                }
                depth -= 1;
            }
            ' ' if depth == 0 && split_at.is_none() && inner[i..].starts_with(" as ") => {
                split_at = Some(i);
            }
            _ => {}
        }
        prev = c;
    }
    None
}

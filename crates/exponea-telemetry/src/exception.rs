//! Turning panics and errors into crash data
//!
//! Provides [`UncaughtException`], built either from the `PanicHookInfo`
//! handed to the panic hook or from a payload recovered with
//! `catch_unwind`, and the stack capture both paths share.

use std::any::Any;
use std::error::Error;
use std::panic::PanicHookInfo;

use backtrace::{Backtrace, BacktraceSymbol};
use exponea_core::domain::ErrorMetadata;

/// Error kind recorded for panics
pub const PANIC_KIND: &str = "panic";

/// Frames at or inside these belong to the panic runtime or to the capture
/// itself and are cut from recorded traces.
const CAPTURE_BORDER_FRAMES: &[&str] = &[
    "std::panicking::begin_panic",
    "std::panicking::rust_panic_with_hook",
    "std::panic::panic_any",
    "core::panicking::",
    "rust_begin_unwind",
    "__rust_end_short_backtrace",
    "exponea_telemetry::exception::capture_stack_trace",
];

/// A panic with the stack it was raised on
///
/// Also used for panics the host caught with `catch_unwind` and reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UncaughtException {
    /// Error kind, `"panic"` for panics
    pub kind: String,
    /// Panic message
    pub message: String,
    /// `file:line:column` where the panic was raised, if known
    pub location: Option<String>,
    /// Stack frames, innermost first
    pub stack_trace: Vec<String>,
}

impl UncaughtException {
    /// Creates an exception from already collected parts.
    pub fn new(
        kind: impl Into<String>,
        message: impl Into<String>,
        stack_trace: Vec<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            location: None,
            stack_trace,
        }
    }

    /// Sets the source location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Builds an exception from inside the panic hook.
    pub fn from_panic_info(info: &PanicHookInfo<'_>) -> Self {
        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()));

        Self {
            kind: PANIC_KIND.to_string(),
            message: message_from_payload(info.payload()).to_string(),
            location,
            stack_trace: capture_stack_trace(),
        }
    }

    /// Builds an exception from a payload returned by `catch_unwind`.
    ///
    /// The unwound stack is gone by then, so the trace is the caller's.
    pub fn from_payload(payload: &(dyn Any + Send)) -> Self {
        Self::new(
            PANIC_KIND,
            message_from_payload(payload),
            capture_stack_trace(),
        )
    }

    /// Error metadata stored on the crash log
    pub fn error_metadata(&self) -> ErrorMetadata {
        let message = match &self.location {
            Some(location) => format!("{} (at {location})", self.message),
            None => self.message.clone(),
        };
        ErrorMetadata::new(self.kind.clone(), message)
    }
}

/// Extract the message of a panic payload.
pub fn message_from_payload(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "Box<dyn Any>"
    }
}

/// Error metadata for a reported error, including its source chain.
pub fn error_metadata_from<E>(error: &E) -> ErrorMetadata
where
    E: Error + ?Sized,
{
    let mut causes = Vec::new();
    let mut source = error.source();
    while let Some(cause) = source {
        causes.push(cause.to_string());
        source = cause.source();
    }

    ErrorMetadata::new(std::any::type_name::<E>(), error.to_string()).with_causes(causes)
}

/// Captures the current stack, innermost frame first.
///
/// Panic runtime frames and the capture machinery are trimmed off, so the
/// first frame is the code that panicked (or that asked for the capture).
#[inline(never)]
pub fn capture_stack_trace() -> Vec<String> {
    let backtrace = Backtrace::new();
    let frames = backtrace
        .frames()
        .iter()
        .flat_map(|frame| frame.symbols())
        .map(describe_symbol)
        .collect();
    trim_capture_frames(frames)
}

/// Drops every frame up to and including the outermost border frame.
pub fn trim_capture_frames(frames: Vec<String>) -> Vec<String> {
    match frames.iter().rposition(|frame| is_border_frame(frame)) {
        Some(cutoff) => frames.into_iter().skip(cutoff + 1).collect(),
        None => frames,
    }
}

fn is_border_frame(frame: &str) -> bool {
    CAPTURE_BORDER_FRAMES.iter().any(|b| frame.contains(b))
}

fn describe_symbol(symbol: &BacktraceSymbol) -> String {
    // `{:#}` drops the trailing `::h<hash>` of mangled Rust symbols
    let name = symbol
        .name()
        .map(|n| format!("{n:#}"))
        .unwrap_or_else(|| "<unknown>".to_string());

    match (symbol.filename(), symbol.lineno()) {
        (Some(file), Some(line)) => format!("{name} ({}:{line})", file.display()),
        _ => name,
    }
}

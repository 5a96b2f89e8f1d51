//! SDK relevance of captured stack traces
//!
//! The host application may run its own crash reporter, so only crashes
//! that pass through this SDK's code are worth persisting. A trace is
//! SDK-related when any single frame contains one of the SDK markers.

use exponea_core::config::{TelemetryConfig, DEFAULT_SDK_MARKERS};

/// Decides whether a stack trace belongs to the SDK's own code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrashClassifier {
    markers: Vec<String>,
}

impl CrashClassifier {
    /// Creates a classifier matching frames that contain any of `markers`.
    ///
    /// Blank markers are dropped since they would match every frame.
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let markers = markers
            .into_iter()
            .map(Into::into)
            .filter(|m: &String| !m.trim().is_empty())
            .collect();
        Self { markers }
    }

    /// Creates a classifier from the `telemetry.sdk_markers` setting.
    pub fn from_config(config: &TelemetryConfig) -> Self {
        Self::new(config.sdk_markers.iter().cloned())
    }

    /// Returns `true` if any frame originates from the SDK.
    pub fn is_sdk_related(&self, stack_trace: &[String]) -> bool {
        stack_trace
            .iter()
            .any(|frame| self.markers.iter().any(|m| frame.contains(m.as_str())))
    }

    /// The markers in use.
    pub fn markers(&self) -> &[String] {
        &self.markers
    }
}

impl Default for CrashClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_SDK_MARKERS.iter().copied())
    }
}

//! Crash log entity
//!
//! A `CrashLog` is the immutable record of one captured crash. Fatal logs
//! come from the process-wide panic hook and are persisted until a later
//! launch uploads them; non-fatal logs come from errors the host reports
//! explicitly and are uploaded straight away.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

/// Identifier of a [`CrashLog`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CrashLogId(Uuid);

impl CrashLogId {
    /// Create a new random CrashLogId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a CrashLogId from an existing UUID
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID value
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CrashLogId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for CrashLogId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CrashLogId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DomainError::InvalidId(format!("Invalid CrashLogId: {e}")))
    }
}

impl From<Uuid> for CrashLogId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Free-form description of the error behind a crash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMetadata {
    /// Error kind, e.g. `"panic"` or the Rust type name of a reported error
    pub kind: String,
    /// Human-readable error message
    pub message: String,
    /// Messages of the error's source chain, outermost first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
}

impl ErrorMetadata {
    /// Creates error metadata without a cause chain
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            causes: Vec::new(),
        }
    }

    /// Sets the source chain messages
    pub fn with_causes(mut self, causes: Vec<String>) -> Self {
        self.causes = causes;
        self
    }
}

/// Record of a single captured crash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrashLog {
    id: CrashLogId,
    fatal: bool,
    launch_timestamp: DateTime<Utc>,
    timestamp: DateTime<Utc>,
    stack_trace: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<ErrorMetadata>,
    sdk_version: String,
}

impl CrashLog {
    /// Creates a log for a crash that is terminating the process.
    ///
    /// Only the uncaught panic path produces fatal logs.
    pub fn fatal(
        launch_timestamp: DateTime<Utc>,
        stack_trace: Vec<String>,
        error: Option<ErrorMetadata>,
    ) -> Self {
        Self::new(true, launch_timestamp, stack_trace, error)
    }

    /// Creates a log for an error the application caught and reported.
    pub fn non_fatal(
        launch_timestamp: DateTime<Utc>,
        stack_trace: Vec<String>,
        error: Option<ErrorMetadata>,
    ) -> Self {
        Self::new(false, launch_timestamp, stack_trace, error)
    }

    fn new(
        fatal: bool,
        launch_timestamp: DateTime<Utc>,
        stack_trace: Vec<String>,
        error: Option<ErrorMetadata>,
    ) -> Self {
        Self {
            id: CrashLogId::new(),
            fatal,
            launch_timestamp,
            timestamp: Utc::now(),
            stack_trace,
            error,
            sdk_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Overrides the capture timestamp
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn id(&self) -> &CrashLogId {
        &self.id
    }

    /// `true` for uncaught crashes, `false` for caught and reported errors
    pub fn is_fatal(&self) -> bool {
        self.fatal
    }

    /// When the crashing process was launched
    pub fn launch_timestamp(&self) -> DateTime<Utc> {
        self.launch_timestamp
    }

    /// When the crash was captured
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Stack frames, innermost first
    pub fn stack_trace(&self) -> &[String] {
        &self.stack_trace
    }

    pub fn error(&self) -> Option<&ErrorMetadata> {
        self.error.as_ref()
    }

    pub fn sdk_version(&self) -> &str {
        &self.sdk_version
    }

    /// Short label for logs and metrics: `"fatal"` or `"non_fatal"`
    pub fn kind_label(&self) -> &'static str {
        if self.fatal {
            "fatal"
        } else {
            "non_fatal"
        }
    }
}

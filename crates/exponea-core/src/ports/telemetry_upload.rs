//! Telemetry upload port (driven/secondary port)
//!
//! Delivers a single [`CrashLog`] to the remote collector.
//!
//! ## Design Notes
//!
//! - `upload` returns immediately and never blocks the calling thread.
//! - The outcome is reported through the completion callback, at most once,
//!   on a thread chosen by the implementation. Callers do all follow-up work
//!   (such as deleting the stored log) inside the completion.
//! - Timeouts and retries within one attempt belong to the implementation.

use crate::domain::CrashLog;

/// Completion callback receiving `true` when the collector accepted the log
pub type UploadCompletion = Box<dyn FnOnce(bool) + Send + 'static>;

/// Port trait for crash log delivery
pub trait TelemetryUpload: Send + Sync {
    /// Starts uploading `crash_log` and reports the result to `completion`
    fn upload(&self, crash_log: CrashLog, completion: UploadCompletion);
}

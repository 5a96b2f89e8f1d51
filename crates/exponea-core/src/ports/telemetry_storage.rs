//! Telemetry storage port (driven/secondary port)
//!
//! Durable queue of [`CrashLog`] entities that survives process termination.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific
//!   (filesystem, key-value store, etc.) and the caller only logs them.
//! - Methods are synchronous: `save_crash_log` is called from inside the
//!   panic hook, where no executor can be assumed to make progress.
//! - Each operation must be atomic on its own; deleting one log must never
//!   corrupt or drop another. Transactions spanning several logs are not
//!   required.

use crate::domain::CrashLog;

/// Port trait for persistent crash log storage
pub trait TelemetryStorage: Send + Sync {
    /// Returns every stored crash log, in no particular order
    fn get_all_crash_logs(&self) -> anyhow::Result<Vec<CrashLog>>;

    /// Persists a crash log
    fn save_crash_log(&self, crash_log: &CrashLog) -> anyhow::Result<()>;

    /// Deletes the stored log with the same id as `crash_log`
    ///
    /// Deleting a log that is no longer stored is not an error.
    fn delete_crash_log(&self, crash_log: &CrashLog) -> anyhow::Result<()>;
}

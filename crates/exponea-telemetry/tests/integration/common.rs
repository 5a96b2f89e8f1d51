//! Shared test doubles for crash pipeline integration tests

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use exponea_core::domain::{CrashLog, CrashLogId};
use exponea_core::ports::{TelemetryUpload, UploadCompletion};
use exponea_telemetry::FileCrashLogStore;
use tempfile::TempDir;

static PANIC_HOOK_LOCK: Mutex<()> = Mutex::new(());

/// Serializes tests that replace the process-wide panic hook or panic on
/// purpose.
pub fn lock_panic_hook() -> MutexGuard<'static, ()> {
    PANIC_HOOK_LOCK
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Upload that completes synchronously and records what it was given.
///
/// Uploads fail for the ids in `failing`, or for everything with `fail_all`.
#[derive(Default)]
pub struct RecordingUpload {
    uploaded: Mutex<Vec<CrashLog>>,
    failing: Mutex<HashSet<CrashLogId>>,
    fail_all: bool,
}

impl RecordingUpload {
    pub fn failing_for(ids: &[CrashLogId]) -> Self {
        Self {
            failing: Mutex::new(ids.iter().copied().collect()),
            ..Self::default()
        }
    }

    pub fn failing_all() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    pub fn uploaded(&self) -> Vec<CrashLog> {
        self.uploaded.lock().unwrap().clone()
    }
}

impl TelemetryUpload for RecordingUpload {
    fn upload(&self, crash_log: CrashLog, completion: UploadCompletion) {
        let success = !self.fail_all && !self.failing.lock().unwrap().contains(crash_log.id());
        self.uploaded.lock().unwrap().push(crash_log);
        completion(success);
    }
}

/// A file store in a fresh temporary directory.
///
/// Keep the returned `TempDir` alive for as long as the store is used.
pub fn temp_store() -> (TempDir, Arc<FileCrashLogStore>) {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileCrashLogStore::new(dir.path().join("crashes")));
    (dir, store)
}

pub fn sdk_trace() -> Vec<String> {
    vec![
        "ExponeaSDK.Tracker.track".to_string(),
        "app::main".to_string(),
    ]
}

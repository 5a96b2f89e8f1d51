//! The crash manager installed as the real process panic hook
//!
//! Every test here holds the panic hook lock: the hook is process-wide and
//! the tests panic on purpose.

use std::panic;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use exponea_core::ports::TelemetryStorage;
use exponea_telemetry::{clear_current, current, CrashClassifier, CrashManager};

use crate::common::{self, RecordingUpload};

/// Replaces the panic hook with one that only counts invocations.
fn install_counting_hook() -> Arc<AtomicUsize> {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    panic::set_hook(Box::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    calls
}

/// Puts the default hook back and detaches the current manager.
fn reset_hook() {
    clear_current();
    drop(panic::take_hook());
}

#[inline(never)]
fn exponea_tracker_track() {
    panic!("tracker queue poisoned");
}

#[test]
fn test_original_hook_runs_once_per_panic_after_repeated_starts() {
    let _lock = common::lock_panic_hook();
    let calls = install_counting_hook();
    let (_dir, store) = common::temp_store();

    for _ in 0..3 {
        let manager = Arc::new(
            CrashManager::new(store.clone(), Arc::new(RecordingUpload::default()), Utc::now())
                .with_classifier(CrashClassifier::new(["marker-absent-from-every-frame"])),
        );
        manager.start();
    }

    for _ in 0..2 {
        assert!(panic::catch_unwind(|| panic!("boom")).is_err());
    }

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(store.get_all_crash_logs().unwrap().is_empty());

    reset_hook();
}

#[test]
fn test_cleared_manager_only_forwards() {
    let _lock = common::lock_panic_hook();
    let calls = install_counting_hook();
    let (_dir, store) = common::temp_store();

    let manager = Arc::new(
        CrashManager::new(store.clone(), Arc::new(RecordingUpload::default()), Utc::now())
            .with_classifier(CrashClassifier::new(["exponea_tracker_track"])),
    );
    manager.start();
    assert!(current().is_some());

    clear_current();
    assert!(current().is_none());
    assert!(panic::catch_unwind(exponea_tracker_track).is_err());

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(store.get_all_crash_logs().unwrap().is_empty());

    reset_hook();
}

#[test]
fn test_sdk_panic_is_persisted_by_hook() {
    let _lock = common::lock_panic_hook();
    let calls = install_counting_hook();
    let (_dir, store) = common::temp_store();
    let launch = Utc::now();

    let manager = Arc::new(
        CrashManager::new(store.clone(), Arc::new(RecordingUpload::default()), launch)
            .with_classifier(CrashClassifier::new(["exponea_tracker_track"])),
    );
    manager.start();

    assert!(panic::catch_unwind(exponea_tracker_track).is_err());

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let logs = store.get_all_crash_logs().unwrap();
    assert_eq!(logs.len(), 1);
    assert!(logs[0].is_fatal());
    assert_eq!(logs[0].launch_timestamp(), launch);
    let error = logs[0].error().unwrap();
    assert_eq!(error.kind, "panic");
    assert!(error.message.starts_with("tracker queue poisoned (at "));
    assert!(logs[0]
        .stack_trace()
        .iter()
        .any(|frame| frame.contains("exponea_tracker_track")));

    reset_hook();
}

#[test]
fn test_start_drains_before_installing() {
    let _lock = common::lock_panic_hook();
    let (_dir, store) = common::temp_store();
    let leftover = exponea_core::domain::CrashLog::fatal(Utc::now(), common::sdk_trace(), None);
    store.save_crash_log(&leftover).unwrap();

    let upload = Arc::new(RecordingUpload::default());
    let manager = Arc::new(CrashManager::new(store.clone(), upload.clone(), Utc::now()));
    manager.start();

    assert_eq!(upload.uploaded(), vec![leftover]);
    assert!(store.get_all_crash_logs().unwrap().is_empty());
    assert!(current().is_some_and(|c| Arc::ptr_eq(&c, &manager)));

    reset_hook();
}

//! Crash pipeline against the file store
//!
//! Covers persistence of fatal crashes, the drain on the next launch, the
//! non-fatal fire-and-forget path and retention eviction.

use std::sync::Arc;

use chrono::{Duration, Utc};
use exponea_core::domain::CrashLog;
use exponea_core::ports::TelemetryStorage;
use exponea_telemetry::{CrashManager, RetentionPolicy, TelemetryMetrics, UncaughtException};

use crate::common::{self, RecordingUpload};

#[test]
fn test_drain_keeps_only_failed_uploads() {
    let (_dir, store) = common::temp_store();
    let a = CrashLog::fatal(Utc::now(), common::sdk_trace(), None);
    let b = CrashLog::fatal(Utc::now(), common::sdk_trace(), None);
    store.save_crash_log(&a).unwrap();
    store.save_crash_log(&b).unwrap();

    let upload = Arc::new(RecordingUpload::failing_for(&[*b.id()]));
    let manager = CrashManager::new(store.clone(), upload.clone(), Utc::now());
    manager.upload_crash_logs();

    assert_eq!(upload.uploaded().len(), 2);
    assert_eq!(store.get_all_crash_logs().unwrap(), vec![b]);
}

#[test]
fn test_fatal_crash_is_uploaded_on_next_launch() {
    let (_dir, store) = common::temp_store();
    let first_launch = Utc::now() - Duration::hours(1);

    let crashed = CrashManager::new(
        store.clone(),
        Arc::new(RecordingUpload::default()),
        first_launch,
    );
    crashed.handle_uncaught_exception(
        UncaughtException::new("panic", "tracker queue poisoned", common::sdk_trace())
            .with_location("src/tracker.rs:88:9"),
    );

    let stored = store.get_all_crash_logs().unwrap();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].is_fatal());
    assert_eq!(stored[0].launch_timestamp(), first_launch);
    assert_eq!(stored[0].stack_trace(), common::sdk_trace().as_slice());
    assert_eq!(
        stored[0].error().unwrap().message,
        "tracker queue poisoned (at src/tracker.rs:88:9)"
    );

    let upload = Arc::new(RecordingUpload::default());
    let relaunched = CrashManager::new(store.clone(), upload.clone(), Utc::now());
    relaunched.upload_crash_logs();

    let uploaded = upload.uploaded();
    assert_eq!(uploaded.len(), 1);
    assert_eq!(uploaded[0].id(), stored[0].id());
    assert_eq!(uploaded[0].launch_timestamp(), first_launch);
    assert!(store.get_all_crash_logs().unwrap().is_empty());
}

#[test]
fn test_failed_upload_is_retried_on_next_drain() {
    let (_dir, store) = common::temp_store();
    let log = CrashLog::fatal(Utc::now(), common::sdk_trace(), None);
    store.save_crash_log(&log).unwrap();

    let offline = Arc::new(RecordingUpload::failing_all());
    CrashManager::new(store.clone(), offline.clone(), Utc::now()).upload_crash_logs();
    assert_eq!(store.get_all_crash_logs().unwrap(), vec![log.clone()]);

    let online = Arc::new(RecordingUpload::default());
    CrashManager::new(store.clone(), online.clone(), Utc::now()).upload_crash_logs();
    assert_eq!(online.uploaded(), vec![log]);
    assert!(store.get_all_crash_logs().unwrap().is_empty());
}

#[test]
fn test_non_fatal_error_is_uploaded_not_stored() {
    let (_dir, store) = common::temp_store();
    let upload = Arc::new(RecordingUpload::default());
    let metrics = Arc::new(TelemetryMetrics::new().unwrap());
    let manager =
        CrashManager::new(store.clone(), upload.clone(), Utc::now()).with_metrics(metrics.clone());

    let error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "cache is read-only");
    manager.caught_error_handler(&error, vec!["exponea_sdk::cache::write".to_string()]);

    assert!(store.get_all_crash_logs().unwrap().is_empty());
    let uploaded = upload.uploaded();
    assert_eq!(uploaded.len(), 1);
    assert!(!uploaded[0].is_fatal());
    assert_eq!(uploaded[0].error().unwrap().message, "cache is read-only");
    assert_eq!(
        metrics
            .crash_log_uploads_total
            .with_label_values(&["non_fatal", "success"])
            .get(),
        1
    );
}

#[test]
fn test_caught_panic_payload_is_reported() {
    let (_dir, store) = common::temp_store();
    let upload = Arc::new(RecordingUpload::default());
    let manager = CrashManager::new(store.clone(), upload.clone(), Utc::now());

    let _lock = common::lock_panic_hook();
    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(|_| {}));
    let payload = std::panic::catch_unwind(|| panic!("segment flush failed")).unwrap_err();
    std::panic::set_hook(hook);

    manager.caught_exception_handler(UncaughtException::from_payload(payload.as_ref()));

    let uploaded = upload.uploaded();
    assert_eq!(uploaded.len(), 1);
    assert!(!uploaded[0].is_fatal());
    assert_eq!(uploaded[0].error().unwrap().kind, "panic");
    assert_eq!(uploaded[0].error().unwrap().message, "segment flush failed");
    assert!(store.get_all_crash_logs().unwrap().is_empty());
}

#[test]
fn test_retention_evicts_oldest_over_capacity() {
    let (_dir, store) = common::temp_store();
    let now = Utc::now();
    let logs: Vec<CrashLog> = (1..=3)
        .map(|hours| {
            CrashLog::fatal(now, common::sdk_trace(), None)
                .with_timestamp(now - Duration::hours(hours))
        })
        .collect();
    for log in &logs {
        store.save_crash_log(log).unwrap();
    }

    let upload = Arc::new(RecordingUpload::failing_all());
    CrashManager::new(store.clone(), upload.clone(), now)
        .with_retention(RetentionPolicy::new(Duration::days(30), 2))
        .upload_crash_logs();

    // the oldest log is dropped without an upload attempt
    let uploaded_ids: Vec<_> = upload.uploaded().iter().map(|l| *l.id()).collect();
    assert_eq!(uploaded_ids.len(), 2);
    assert!(!uploaded_ids.contains(logs[2].id()));

    let remaining = store.get_all_crash_logs().unwrap();
    assert_eq!(remaining.len(), 2);
    assert!(remaining.iter().all(|l| l.id() != logs[2].id()));
}

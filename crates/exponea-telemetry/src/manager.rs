//! Crash manager
//!
//! Orchestrates the crash pipeline: drains stored logs at startup, installs
//! the panic hook, persists SDK-related fatal crashes and uploads non-fatal
//! ones straight away. Storage and upload failures are logged, never raised.

use std::error::Error;
use std::panic::PanicHookInfo;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use exponea_core::config::Config;
use exponea_core::domain::CrashLog;
use exponea_core::ports::{TelemetryStorage, TelemetryUpload};
use tracing::{debug, error, info, warn};

use crate::classifier::CrashClassifier;
use crate::exception::{error_metadata_from, UncaughtException};
use crate::metrics::TelemetryMetrics;
use crate::registration::{self, PanicHook};
use crate::retention::RetentionPolicy;

/// Captures crashes and delivers them to the collector.
///
/// Fatal crashes (uncaught panics) are persisted synchronously from the
/// panic hook and uploaded on the next [`start`](Self::start); a log is only
/// deleted once its upload succeeded. Caught errors are uploaded immediately
/// and never persisted or retried.
pub struct CrashManager {
    storage: Arc<dyn TelemetryStorage>,
    upload: Arc<dyn TelemetryUpload>,
    launch_timestamp: DateTime<Utc>,
    classifier: CrashClassifier,
    retention: RetentionPolicy,
    metrics: Option<Arc<TelemetryMetrics>>,
    previous_handler: Mutex<Option<PanicHook>>,
}

impl CrashManager {
    /// Creates a manager for a process launched at `launch_timestamp`.
    pub fn new(
        storage: Arc<dyn TelemetryStorage>,
        upload: Arc<dyn TelemetryUpload>,
        launch_timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            storage,
            upload,
            launch_timestamp,
            classifier: CrashClassifier::default(),
            retention: RetentionPolicy::default(),
            metrics: None,
            previous_handler: Mutex::new(None),
        }
    }

    /// Creates a manager with classifier and retention taken from `config`.
    pub fn from_config(
        config: &Config,
        storage: Arc<dyn TelemetryStorage>,
        upload: Arc<dyn TelemetryUpload>,
        launch_timestamp: DateTime<Utc>,
    ) -> Self {
        Self::new(storage, upload, launch_timestamp)
            .with_classifier(CrashClassifier::from_config(&config.telemetry))
            .with_retention(RetentionPolicy::from_config(&config.telemetry))
    }

    pub fn with_classifier(mut self, classifier: CrashClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<TelemetryMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn launch_timestamp(&self) -> DateTime<Utc> {
        self.launch_timestamp
    }

    pub fn metrics(&self) -> Option<&Arc<TelemetryMetrics>> {
        self.metrics.as_ref()
    }

    /// Uploads logs left by earlier runs, then installs the panic hook and
    /// makes this manager the current one.
    ///
    /// Starting again (this or another manager) keeps the hook chain intact.
    pub fn start(self: &Arc<Self>) {
        info!(launch_timestamp = %self.launch_timestamp, "Starting crash manager");
        self.upload_crash_logs();
        registration::install(self);
    }

    /// Entry point of the installed panic hook.
    ///
    /// Runs the hook that was active before this manager started, then
    /// records the panic.
    pub fn uncaught_exception_handler(&self, info: &PanicHookInfo<'_>) {
        if let Some(previous) = self.previous_handler() {
            previous(info);
        }

        error!("Handling uncaught exception");
        self.handle_uncaught_exception(UncaughtException::from_panic_info(info));
    }

    /// Persists `exception` as a fatal crash log if it involves SDK code.
    pub fn handle_uncaught_exception(&self, exception: UncaughtException) {
        if !self.classifier.is_sdk_related(&exception.stack_trace) {
            debug!("Uncaught exception is not related to the SDK, skipping");
            return;
        }

        let error = exception.error_metadata();
        let crash_log = CrashLog::fatal(self.launch_timestamp, exception.stack_trace, Some(error));
        self.record_captured(&crash_log);

        match self.storage.save_crash_log(&crash_log) {
            Ok(()) => info!(crash_log_id = %crash_log.id(), "Crash log saved"),
            Err(e) => {
                error!(crash_log_id = %crash_log.id(), error = %e, "Unable to save crash log");
                self.record_storage_error("save");
            }
        }
    }

    /// Reports a panic the application caught.
    pub fn caught_exception_handler(&self, exception: UncaughtException) {
        let error = exception.error_metadata();
        let crash_log =
            CrashLog::non_fatal(self.launch_timestamp, exception.stack_trace, Some(error));
        self.upload_non_fatal(crash_log);
    }

    /// Reports an error the application handled, including its source chain.
    pub fn caught_error_handler<E>(&self, error: &E, stack_trace: Vec<String>)
    where
        E: Error + ?Sized,
    {
        let crash_log = CrashLog::non_fatal(
            self.launch_timestamp,
            stack_trace,
            Some(error_metadata_from(error)),
        );
        self.upload_non_fatal(crash_log);
    }

    /// Uploads every stored crash log, deleting each one whose upload
    /// succeeded.
    ///
    /// Logs outside the retention policy are deleted without upload.
    pub fn upload_crash_logs(&self) {
        let logs = match self.storage.get_all_crash_logs() {
            Ok(logs) => logs,
            Err(e) => {
                error!(error = %e, "Unable to read stored crash logs");
                self.record_storage_error("read");
                return;
            }
        };

        let outcome = self.retention.apply(logs, Utc::now());
        for (crash_log, reason) in outcome.evicted {
            warn!(
                crash_log_id = %crash_log.id(),
                reason = reason.as_str(),
                "Dropping stored crash log without upload"
            );
            if let Some(metrics) = &self.metrics {
                metrics.record_eviction(reason.as_str());
            }
            if let Err(e) = self.storage.delete_crash_log(&crash_log) {
                error!(crash_log_id = %crash_log.id(), error = %e, "Unable to delete crash log");
                self.record_storage_error("delete");
            }
        }

        debug!(count = outcome.retained.len(), "Uploading stored crash logs");
        for crash_log in outcome.retained {
            self.upload_stored(crash_log);
        }
    }

    fn upload_stored(&self, crash_log: CrashLog) {
        let storage = Arc::clone(&self.storage);
        let metrics = self.metrics.clone();
        let stored = crash_log.clone();

        self.upload.upload(
            crash_log,
            Box::new(move |success| {
                if let Some(metrics) = &metrics {
                    metrics.record_upload(stored.kind_label(), success);
                }
                if !success {
                    warn!(crash_log_id = %stored.id(), "Uploading crash log failed, keeping it for the next start");
                    return;
                }

                match storage.delete_crash_log(&stored) {
                    Ok(()) => debug!(crash_log_id = %stored.id(), "Uploaded crash log deleted"),
                    Err(e) => {
                        error!(crash_log_id = %stored.id(), error = %e, "Unable to delete crash log");
                        if let Some(metrics) = &metrics {
                            metrics.record_storage_error("delete");
                        }
                    }
                }
            }),
        );
    }

    fn upload_non_fatal(&self, crash_log: CrashLog) {
        self.record_captured(&crash_log);
        let crash_log_id = *crash_log.id();
        let metrics = self.metrics.clone();

        self.upload.upload(
            crash_log,
            Box::new(move |success| {
                if let Some(metrics) = &metrics {
                    metrics.record_upload("non_fatal", success);
                }
                if success {
                    debug!(%crash_log_id, "Crash log uploaded");
                } else {
                    warn!(%crash_log_id, "Uploading crash log failed");
                }
            }),
        );
    }

    pub(crate) fn set_previous_handler(&self, hook: PanicHook) {
        *self
            .previous_handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(hook);
    }

    fn previous_handler(&self) -> Option<PanicHook> {
        self.previous_handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record_captured(&self, crash_log: &CrashLog) {
        if let Some(metrics) = &self.metrics {
            metrics.record_captured(crash_log.kind_label());
        }
    }

    fn record_storage_error(&self, operation: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_storage_error(operation);
        }
    }
}

//! Prometheus counters for the crash pipeline

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// Registry holding the crash telemetry counters.
pub struct TelemetryMetrics {
    registry: Registry,
    /// Counter: crash logs created by kind (fatal, non_fatal)
    pub crash_logs_captured_total: IntCounterVec,
    /// Counter: upload attempts by (kind, status)
    pub crash_log_uploads_total: IntCounterVec,
    /// Counter: stored logs dropped without upload by reason
    pub crash_logs_evicted_total: IntCounterVec,
    /// Counter: failed storage operations by operation (read, save, delete)
    pub storage_errors_total: IntCounterVec,
}

impl TelemetryMetrics {
    /// Creates a new `TelemetryMetrics` with all counters registered.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new_custom(Some("exponea".to_string()), None)?;

        let crash_logs_captured_total = IntCounterVec::new(
            Opts::new("crash_logs_captured_total", "Crash logs created"),
            &["kind"],
        )?;
        registry.register(Box::new(crash_logs_captured_total.clone()))?;

        let crash_log_uploads_total = IntCounterVec::new(
            Opts::new("crash_log_uploads_total", "Crash log upload attempts"),
            &["kind", "status"],
        )?;
        registry.register(Box::new(crash_log_uploads_total.clone()))?;

        let crash_logs_evicted_total = IntCounterVec::new(
            Opts::new(
                "crash_logs_evicted_total",
                "Stored crash logs deleted without upload",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(crash_logs_evicted_total.clone()))?;

        let storage_errors_total = IntCounterVec::new(
            Opts::new("storage_errors_total", "Failed crash log storage operations"),
            &["operation"],
        )?;
        registry.register(Box::new(storage_errors_total.clone()))?;

        Ok(Self {
            registry,
            crash_logs_captured_total,
            crash_log_uploads_total,
            crash_logs_evicted_total,
            storage_errors_total,
        })
    }

    pub fn record_captured(&self, kind: &str) {
        self.crash_logs_captured_total
            .with_label_values(&[kind])
            .inc();
    }

    pub fn record_upload(&self, kind: &str, success: bool) {
        let status = if success { "success" } else { "failure" };
        self.crash_log_uploads_total
            .with_label_values(&[kind, status])
            .inc();
    }

    pub fn record_eviction(&self, reason: &str) {
        self.crash_logs_evicted_total
            .with_label_values(&[reason])
            .inc();
    }

    pub fn record_storage_error(&self, operation: &str) {
        self.storage_errors_total
            .with_label_values(&[operation])
            .inc();
    }

    /// Encode all metrics in Prometheus text exposition format.
    pub fn encode(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_registry_encodes() {
        let metrics = TelemetryMetrics::new().expect("create metrics");
        let output = metrics.encode().expect("encode");
        assert!(output.is_empty() || output.contains("exponea"));
    }

    #[test]
    fn test_upload_outcomes_are_labeled() {
        let metrics = TelemetryMetrics::new().unwrap();
        metrics.record_upload("fatal", true);
        metrics.record_upload("fatal", false);
        metrics.record_upload("fatal", false);

        assert_eq!(
            metrics
                .crash_log_uploads_total
                .with_label_values(&["fatal", "failure"])
                .get(),
            2
        );
        let output = metrics.encode().unwrap();
        assert!(output.contains("exponea_crash_log_uploads_total"));
        assert!(output.contains("status=\"success\""));
    }

    #[test]
    fn test_captured_evicted_and_storage_errors() {
        let metrics = TelemetryMetrics::new().unwrap();
        metrics.record_captured("non_fatal");
        metrics.record_eviction("expired");
        metrics.record_storage_error("save");

        let output = metrics.encode().unwrap();
        assert!(output.contains("exponea_crash_logs_captured_total{kind=\"non_fatal\"} 1"));
        assert!(output.contains("exponea_crash_logs_evicted_total{reason=\"expired\"} 1"));
        assert!(output.contains("exponea_storage_errors_total{operation=\"save\"} 1"));
    }
}

//! Exponea Telemetry - Crash capture, persistence and upload
//!
//! Provides:
//! - `CrashManager`: Panic hook chaining, crash persistence and upload
//! - `CrashClassifier`: Decides whether a stack trace involves SDK code
//! - `UncaughtException`: Panic details with a trimmed stack trace
//! - `RetentionPolicy`: Age and count bounds for stored crash logs
//! - `FileCrashLogStore`: JSON file storage adapter
//! - `HttpTelemetryUpload`: HTTP upload adapter
//! - `Anonymizer`: PII stripping before upload
//! - `TelemetryMetrics`: Prometheus counters for the pipeline

pub mod anonymizer;
pub mod classifier;
pub mod exception;
pub mod manager;
pub mod metrics;
pub mod registration;
pub mod retention;
pub mod store;
pub mod upload;

pub use anonymizer::Anonymizer;
pub use classifier::CrashClassifier;
pub use exception::{capture_stack_trace, UncaughtException};
pub use manager::CrashManager;
pub use metrics::TelemetryMetrics;
pub use registration::{clear_current, current};
pub use retention::{EvictionReason, RetentionPolicy};
pub use store::{CrashLogEntry, FileCrashLogStore, StoreError};
pub use upload::HttpTelemetryUpload;

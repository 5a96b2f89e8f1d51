//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the interfaces the crash manager depends on, while their
//! implementations live in adapter code.
//!
//! ## Ports Overview
//!
//! - [`TelemetryStorage`] - Durable queue of crash logs awaiting upload
//! - [`TelemetryUpload`] - Asynchronous delivery of one crash log to the collector

pub mod telemetry_storage;
pub mod telemetry_upload;

pub use telemetry_storage::TelemetryStorage;
pub use telemetry_upload::{TelemetryUpload, UploadCompletion};

//! Domain entities for crash telemetry
//!
//! This module contains the core domain types:
//! - `CrashLog` and its identifier, the record of one captured crash
//! - `DataType`, the tagged values outgoing payloads are assembled from
//! - Domain-specific error types

pub mod crash_log;
pub mod data_type;
pub mod errors;

// Re-export commonly used types
pub use crash_log::{CrashLog, CrashLogId, ErrorMetadata};
pub use data_type::{DataType, DataTypeSliceExt};
pub use errors::DomainError;

//! Exponea Core - Crash telemetry domain logic and contracts
//!
//! This crate contains the hexagonal core of the crash telemetry pipeline:
//! - **Domain entities** - `CrashLog`, `CrashLogId`, `ErrorMetadata`, `DataType`
//! - **Port definitions** - Traits for adapters: `TelemetryStorage`, `TelemetryUpload`
//! - **Configuration** - YAML-backed `Config` with validation and a builder
//!
//! # Architecture
//!
//! The domain module contains pure data types with no I/O. Ports define the
//! trait interfaces that the crash manager depends on; their implementations
//! (file storage, HTTP upload) live in `exponea-telemetry`.

pub mod config;
pub mod domain;
pub mod ports;

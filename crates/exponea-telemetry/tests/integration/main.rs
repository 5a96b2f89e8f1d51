//! Integration tests for exponea-telemetry
//!
//! Drives the crash manager against the file store, a recording upload and
//! a wiremock collector, and exercises the real process panic hook.

mod common;

mod test_crash_pipeline;
mod test_http_upload;
mod test_panic_hook;

//! HTTP delivery of crash logs
//!
//! [`HttpTelemetryUpload`] implements the upload port by POSTing a JSON event
//! to the collector endpoint. The payload is assembled synchronously from
//! [`DataType`] values; the request itself runs on a tokio runtime so
//! `upload` never blocks its caller.

use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use exponea_core::config::UploadConfig;
use exponea_core::domain::{CrashLog, DataType, DataTypeSliceExt};
use exponea_core::ports::{TelemetryUpload, UploadCompletion};
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde_json::{json, Map, Value};
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::anonymizer::Anonymizer;

/// Event type for fatal crash logs
pub const CRASH_EVENT_TYPE: &str = "crash";
/// Event type for non-fatal crash logs
pub const ERROR_EVENT_TYPE: &str = "error";

/// Uploads crash logs to the telemetry collector over HTTP
pub struct HttpTelemetryUpload {
    client: Client,
    endpoint: String,
    project_token: Option<String>,
    anonymizer: Option<Anonymizer>,
    runtime: Handle,
}

impl HttpTelemetryUpload {
    /// Creates an uploader for `config`, spawning requests on `runtime`.
    pub fn new(config: &UploadConfig, runtime: Handle) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("exponea-telemetry/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            project_token: config.project_token.clone(),
            anonymizer: None,
            runtime,
        })
    }

    /// Scrubs frames and error text with `anonymizer` before sending
    pub fn with_anonymizer(mut self, anonymizer: Anonymizer) -> Self {
        self.anonymizer = Some(anonymizer);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Describes `crash_log` as tracking data.
    pub fn payload_data(&self, crash_log: &CrashLog) -> Vec<DataType> {
        let mut data = Vec::with_capacity(4);
        if let Some(token) = &self.project_token {
            data.push(DataType::ProjectToken(token.clone()));
        }

        let event_type = if crash_log.is_fatal() {
            CRASH_EVENT_TYPE
        } else {
            ERROR_EVENT_TYPE
        };
        data.push(DataType::EventType(event_type.to_string()));
        data.push(DataType::Timestamp(Some(epoch_seconds(crash_log.timestamp()))));
        data.push(DataType::Properties(self.properties(crash_log)));
        data
    }

    /// JSON request body for `crash_log`
    pub fn build_payload(&self, crash_log: &CrashLog) -> Value {
        let data = self.payload_data(crash_log);
        json!({
            "project_token": data.project_token(),
            "event_type": data.event_types().first(),
            "timestamp": data.latest_timestamp(),
            "properties": data.properties(),
        })
    }

    fn properties(&self, crash_log: &CrashLog) -> Map<String, Value> {
        let stack_trace = match &self.anonymizer {
            Some(anonymizer) => anonymizer.anonymize_frames(crash_log.stack_trace()),
            None => crash_log.stack_trace().to_vec(),
        };

        let mut properties = Map::new();
        properties.insert("crash_log_id".into(), json!(crash_log.id().to_string()));
        properties.insert("fatal".into(), json!(crash_log.is_fatal()));
        properties.insert(
            "launch_timestamp".into(),
            json!(crash_log.launch_timestamp().to_rfc3339()),
        );
        properties.insert("stack_trace".into(), json!(stack_trace));

        if let Some(error) = crash_log.error() {
            let error = match &self.anonymizer {
                Some(anonymizer) => anonymizer.anonymize_error(error),
                None => error.clone(),
            };
            properties.insert("error_kind".into(), json!(error.kind));
            properties.insert("error_message".into(), json!(error.message));
            properties.insert("error_causes".into(), json!(error.causes));
        }

        properties.insert("sdk_version".into(), json!(crash_log.sdk_version()));
        properties.insert("os".into(), json!(std::env::consts::OS));
        properties.insert("arch".into(), json!(std::env::consts::ARCH));
        properties
    }
}

impl TelemetryUpload for HttpTelemetryUpload {
    fn upload(&self, crash_log: CrashLog, completion: UploadCompletion) {
        let body = self.build_payload(&crash_log);
        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.project_token {
            request = request.header(AUTHORIZATION, format!("Token {token}"));
        }
        let crash_log_id = *crash_log.id();

        self.runtime.spawn(async move {
            let success = match request.send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(%crash_log_id, status = %response.status(), "Crash log delivered");
                    true
                }
                Ok(response) => {
                    warn!(%crash_log_id, status = %response.status(), "Collector rejected crash log");
                    false
                }
                Err(e) => {
                    warn!(%crash_log_id, error = %e, "Crash log request failed");
                    false
                }
            };
            completion(success);
        });
    }
}

fn epoch_seconds(timestamp: DateTime<Utc>) -> f64 {
    timestamp.timestamp_millis() as f64 / 1000.0
}

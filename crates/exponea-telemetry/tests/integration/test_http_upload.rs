//! HTTP upload against a wiremock collector

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use exponea_core::config::UploadConfig;
use exponea_core::domain::{CrashLog, ErrorMetadata};
use exponea_core::ports::{TelemetryStorage, TelemetryUpload};
use exponea_telemetry::{CrashManager, HttpTelemetryUpload};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use crate::common;

fn upload_config(server: &MockServer, token: Option<&str>) -> UploadConfig {
    UploadConfig {
        endpoint: format!("{}/telemetry/crashes", server.uri()),
        project_token: token.map(str::to_string),
        timeout_secs: 5,
    }
}

/// Runs one upload and waits for its completion.
async fn upload_once(upload: &HttpTelemetryUpload, crash_log: CrashLog) -> bool {
    let (tx, rx) = oneshot::channel();
    upload.upload(
        crash_log,
        Box::new(move |success| {
            let _ = tx.send(success);
        }),
    );
    rx.await.expect("completion was dropped")
}

#[tokio::test]
async fn test_accepted_upload_completes_with_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/telemetry/crashes"))
        .and(header("authorization", "Token project-42"))
        .and(body_partial_json(serde_json::json!({
            "project_token": "project-42",
            "event_type": "crash",
            "properties": { "fatal": true, "error_message": "boom" }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let upload =
        HttpTelemetryUpload::new(&upload_config(&server, Some("project-42")), Handle::current())
            .unwrap();
    let crash_log = CrashLog::fatal(
        Utc::now(),
        common::sdk_trace(),
        Some(ErrorMetadata::new("panic", "boom")),
    );

    assert!(upload_once(&upload, crash_log).await);
}

#[tokio::test]
async fn test_rejected_upload_completes_with_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/telemetry/crashes"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let upload = HttpTelemetryUpload::new(&upload_config(&server, None), Handle::current()).unwrap();
    let crash_log = CrashLog::non_fatal(Utc::now(), vec![], None);

    assert!(!upload_once(&upload, crash_log).await);
}

#[tokio::test]
async fn test_unreachable_collector_completes_with_failure() {
    let config = UploadConfig {
        endpoint: "http://127.0.0.1:9/telemetry/crashes".to_string(),
        project_token: None,
        timeout_secs: 2,
    };
    let upload = HttpTelemetryUpload::new(&config, Handle::current()).unwrap();
    let crash_log = CrashLog::fatal(Utc::now(), common::sdk_trace(), None);

    assert!(!upload_once(&upload, crash_log).await);
}

#[tokio::test]
async fn test_drain_through_http_deletes_delivered_logs() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/telemetry/crashes"))
        .respond_with(ResponseTemplate::new(202))
        .expect(2)
        .mount(&server)
        .await;

    let (_dir, store) = common::temp_store();
    for _ in 0..2 {
        store
            .save_crash_log(&CrashLog::fatal(Utc::now(), common::sdk_trace(), None))
            .unwrap();
    }

    let upload = Arc::new(
        HttpTelemetryUpload::new(&upload_config(&server, None), Handle::current()).unwrap(),
    );
    let manager = CrashManager::new(store.clone(), upload, Utc::now());
    manager.upload_crash_logs();

    // deletes happen in the upload completions, on the runtime
    for _ in 0..100 {
        if store.get_all_crash_logs().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(store.get_all_crash_logs().unwrap().is_empty());
}

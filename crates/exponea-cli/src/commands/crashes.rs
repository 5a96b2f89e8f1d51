//! Crash log commands
//!
//! - `list`: Show all stored crash logs
//! - `view <id>`: Display one crash log
//! - `send`: Upload stored logs and wait for every result
//! - `delete <id> | --all`: Remove logs from local storage

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use exponea_core::domain::{CrashLog, CrashLogId};
use exponea_core::ports::{TelemetryUpload, UploadCompletion};
use exponea_telemetry::{Anonymizer, CrashManager, HttpTelemetryUpload};
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::info;

use super::CliContext;
use crate::output::get_formatter;

/// List stored crash logs
#[derive(Debug, Args)]
pub struct ListCommand {}

impl ListCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = get_formatter(ctx.format);
        let entries = ctx.store().entries()?;

        if ctx.format.is_json() {
            let json: Vec<serde_json::Value> = entries
                .iter()
                .map(|e| {
                    serde_json::json!({
                        "id": e.id.to_string(),
                        "kind": kind_label(e.fatal),
                        "date": e.date,
                        "size_bytes": e.size_bytes,
                    })
                })
                .collect();
            formatter.print_json(&serde_json::json!(json));
            return Ok(());
        }

        if entries.is_empty() {
            formatter.info("No crash logs found.");
            return Ok(());
        }

        println!("{:<36}  {:<9} {:<10} {:>10}", "ID", "Kind", "Date", "Size");
        println!("{}", "-".repeat(68));
        for entry in &entries {
            println!(
                "{:<36}  {:<9} {:<10} {:>10}",
                entry.id.to_string(),
                kind_label(entry.fatal),
                entry.date,
                format_size(entry.size_bytes),
            );
        }
        println!();
        println!("Total: {} crash log(s)", entries.len());
        Ok(())
    }
}

/// Show one crash log
#[derive(Debug, Args)]
pub struct ViewCommand {
    /// Crash log ID
    id: String,
    /// Show raw JSON instead of a summary
    #[arg(long)]
    json: bool,
}

impl ViewCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = get_formatter(ctx.format);
        let id = parse_id(&self.id)?;

        let Some(crash_log) = ctx.store().read(&id)? else {
            formatter.error(&format!("Crash log '{id}' not found"));
            return Ok(());
        };

        if self.json || ctx.format.is_json() {
            let value =
                serde_json::to_value(&crash_log).context("Failed to serialize crash log")?;
            println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
        } else {
            print_summary(&crash_log);
        }
        Ok(())
    }
}

/// Upload stored crash logs
#[derive(Debug, Args)]
pub struct SendCommand {}

impl SendCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = get_formatter(ctx.format);
        let config = &ctx.config;
        let store = Arc::new(ctx.store());

        if store.entries()?.is_empty() {
            formatter.info("No crash logs to send.");
            if ctx.format.is_json() {
                formatter.print_json(&serde_json::json!({"delivered": 0, "failed": 0, "remaining": 0}));
            }
            return Ok(());
        }

        let http = HttpTelemetryUpload::new(&config.upload, Handle::current())?
            .with_anonymizer(Anonymizer::new(&config.anonymize));
        let upload = Arc::new(TrackedUpload::new(http));

        info!(endpoint = %config.upload.endpoint, "Sending stored crash logs");
        let manager = CrashManager::from_config(config, store.clone(), upload.clone(), Utc::now());
        manager.upload_crash_logs();
        upload.wait_idle().await;

        let delivered = upload.succeeded();
        let failed = upload.failed();
        let remaining = store.entries()?.len();

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "delivered": delivered,
                "failed": failed,
                "remaining": remaining,
            }));
        } else if failed == 0 {
            formatter.success(&format!("Sent {delivered} crash log(s)"));
        } else {
            formatter.warn(&format!(
                "Sent {delivered} crash log(s), {failed} failed and will be retried"
            ));
        }
        if remaining > 0 {
            formatter.info(&format!("{remaining} crash log(s) still stored"));
        }
        Ok(())
    }
}

/// Delete stored crash logs
#[derive(Debug, Args)]
pub struct DeleteCommand {
    /// Crash log ID to delete
    id: Option<String>,
    /// Delete all crash logs
    #[arg(long, conflicts_with = "id")]
    all: bool,
}

impl DeleteCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = get_formatter(ctx.format);
        let store = ctx.store();

        if self.all {
            let count = store.delete_all()?;
            formatter.success(&format!("Deleted {count} crash log(s)"));
        } else if let Some(raw_id) = &self.id {
            let id = parse_id(raw_id)?;
            if store.delete(&id)? {
                formatter.success(&format!("Deleted crash log '{id}'"));
            } else {
                formatter.error(&format!("Crash log '{id}' not found"));
            }
        } else {
            formatter.error("Specify a crash log ID or use --all");
        }
        Ok(())
    }
}

/// Upload decorator counting results so `send` can wait for all of them
struct TrackedUpload<U> {
    inner: U,
    progress: Arc<Progress>,
}

#[derive(Default)]
struct Progress {
    in_flight: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    idle: Notify,
}

impl<U> TrackedUpload<U> {
    fn new(inner: U) -> Self {
        Self {
            inner,
            progress: Arc::new(Progress::default()),
        }
    }

    /// Resolves once every started upload has completed.
    async fn wait_idle(&self) {
        while self.progress.in_flight.load(Ordering::SeqCst) > 0 {
            self.progress.idle.notified().await;
        }
    }

    fn succeeded(&self) -> usize {
        self.progress.succeeded.load(Ordering::SeqCst)
    }

    fn failed(&self) -> usize {
        self.progress.failed.load(Ordering::SeqCst)
    }
}

impl<U: TelemetryUpload> TelemetryUpload for TrackedUpload<U> {
    fn upload(&self, crash_log: CrashLog, completion: UploadCompletion) {
        self.progress.in_flight.fetch_add(1, Ordering::SeqCst);
        let in_flight = InFlight {
            progress: Arc::clone(&self.progress),
            outcome: None,
        };

        self.inner.upload(
            crash_log,
            Box::new(move |success| {
                completion(success);
                in_flight.settle(success);
            }),
        );
    }
}

/// One started upload; a completion dropped without being called counts
/// as failed.
struct InFlight {
    progress: Arc<Progress>,
    outcome: Option<bool>,
}

impl InFlight {
    fn settle(mut self, success: bool) {
        self.outcome = Some(success);
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let progress = &self.progress;
        let counter = if self.outcome == Some(true) {
            &progress.succeeded
        } else {
            &progress.failed
        };
        counter.fetch_add(1, Ordering::SeqCst);
        if progress.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            // notify_one keeps a permit if nobody is waiting yet
            progress.idle.notify_one();
        }
    }
}

fn parse_id(raw: &str) -> Result<CrashLogId> {
    raw.parse::<CrashLogId>()
        .with_context(|| format!("'{raw}' is not a crash log ID"))
}

fn kind_label(fatal: bool) -> &'static str {
    if fatal {
        "fatal"
    } else {
        "non-fatal"
    }
}

fn print_summary(crash_log: &CrashLog) {
    println!("id: {}", crash_log.id());
    println!("kind: {}", kind_label(crash_log.is_fatal()));
    println!("captured: {}", crash_log.timestamp().to_rfc3339());
    println!("launched: {}", crash_log.launch_timestamp().to_rfc3339());
    println!("sdk_version: {}", crash_log.sdk_version());
    if let Some(error) = crash_log.error() {
        println!("error: {}: {}", error.kind, error.message);
        for cause in &error.causes {
            println!("  caused by: {cause}");
        }
    }
    println!("stack trace:");
    for (index, frame) in crash_log.stack_trace().iter().enumerate() {
        println!("  {index:>3}: {frame}");
    }
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

//! Bounds on how long stored crash logs are retried
//!
//! A fatal log that never uploads would otherwise be retried on every start
//! forever. The policy is evaluated on each drain: logs older than
//! `max_age` are dropped, and past `max_stored_logs` the oldest are dropped.
//! Evicted logs are deleted without being uploaded.

use chrono::{DateTime, Duration, Utc};
use exponea_core::config::TelemetryConfig;
use exponea_core::domain::CrashLog;

/// Why a stored log was evicted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
    /// Captured longer ago than the maximum age
    Expired,
    /// Beyond the maximum number of stored logs
    OverCapacity,
}

impl EvictionReason {
    /// Label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expired => "expired",
            Self::OverCapacity => "over_capacity",
        }
    }
}

/// Result of applying a [`RetentionPolicy`]
#[derive(Debug, Default)]
pub struct RetentionOutcome {
    /// Logs to upload, oldest first
    pub retained: Vec<CrashLog>,
    /// Logs to delete without uploading
    pub evicted: Vec<(CrashLog, EvictionReason)>,
}

/// Age and count limits for stored crash logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    max_age: Duration,
    max_stored_logs: usize,
}

impl RetentionPolicy {
    pub const DEFAULT_MAX_AGE_DAYS: i64 = 30;
    pub const DEFAULT_MAX_STORED_LOGS: usize = 50;

    pub fn new(max_age: Duration, max_stored_logs: usize) -> Self {
        Self {
            max_age,
            max_stored_logs,
        }
    }

    pub fn from_config(config: &TelemetryConfig) -> Self {
        Self::new(
            Duration::days(i64::from(config.max_log_age_days)),
            config.max_stored_logs as usize,
        )
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub fn max_stored_logs(&self) -> usize {
        self.max_stored_logs
    }

    /// Splits `logs` into those to upload and those to evict.
    pub fn apply(&self, logs: Vec<CrashLog>, now: DateTime<Utc>) -> RetentionOutcome {
        let mut outcome = RetentionOutcome::default();

        let (mut fresh, expired): (Vec<_>, Vec<_>) = logs
            .into_iter()
            .partition(|log| now.signed_duration_since(log.timestamp()) <= self.max_age);
        outcome
            .evicted
            .extend(expired.into_iter().map(|log| (log, EvictionReason::Expired)));

        // newest first, so the cap keeps the most recent crashes
        fresh.sort_by_key(|log| std::cmp::Reverse(log.timestamp()));
        if fresh.len() > self.max_stored_logs {
            let overflow = fresh.split_off(self.max_stored_logs);
            outcome.evicted.extend(
                overflow
                    .into_iter()
                    .map(|log| (log, EvictionReason::OverCapacity)),
            );
        }

        fresh.reverse();
        outcome.retained = fresh;
        outcome
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(
            Duration::days(Self::DEFAULT_MAX_AGE_DAYS),
            Self::DEFAULT_MAX_STORED_LOGS,
        )
    }
}

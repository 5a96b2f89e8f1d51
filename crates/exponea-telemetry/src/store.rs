//! Local crash log storage
//!
//! Keeps one JSON file per crash log in `~/.local/share/exponea/crashes/`,
//! named `crash-YYYYMMDD-<id>.json` (or `error-…` for non-fatal logs).

use std::fs;
use std::path::{Path, PathBuf};

use exponea_core::domain::{CrashLog, CrashLogId};
use exponea_core::ports::TelemetryStorage;
use thiserror::Error;
use tracing::{debug, warn};

const FATAL_PREFIX: &str = "crash";
const NON_FATAL_PREFIX: &str = "error";

/// Errors raised by [`FileCrashLogStore`]
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid crash log in {path}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Not a crash log file name: {0}")]
    InvalidFileName(String),
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Entry in the local crash log store
#[derive(Debug, Clone)]
pub struct CrashLogEntry {
    pub id: CrashLogId,
    pub fatal: bool,
    /// Capture date as `YYYYMMDD`
    pub date: String,
    pub size_bytes: u64,
    pub path: PathBuf,
}

/// Manages the local directory of crash log files.
pub struct FileCrashLogStore {
    dir: PathBuf,
}

impl FileCrashLogStore {
    /// Creates a new store pointing at `dir`. The directory is created on
    /// first save.
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Returns the default crash log directory.
    pub fn default_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("exponea")
            .join("crashes")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Lists stored crash log files, newest date first.
    ///
    /// Files whose names don't follow the crash log pattern are ignored.
    pub fn entries(&self) -> Result<Vec<CrashLogEntry>, StoreError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        let read_dir = fs::read_dir(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;
        for entry in read_dir {
            let entry = entry.map_err(|e| StoreError::io(&self.dir, e))?;
            let path = entry.path();

            if !path.extension().is_some_and(|e| e == "json") {
                continue;
            }

            let stem = path
                .file_stem()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string();
            let (fatal, date, id) = match parse_file_stem(&stem) {
                Ok(parts) => parts,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Skipping unrelated file");
                    continue;
                }
            };
            let metadata = entry.metadata().map_err(|e| StoreError::io(&path, e))?;

            entries.push(CrashLogEntry {
                id,
                fatal,
                date,
                size_bytes: metadata.len(),
                path,
            });
        }

        entries.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(entries)
    }

    /// Reads one crash log by id.
    pub fn read(&self, id: &CrashLogId) -> Result<Option<CrashLog>, StoreError> {
        match self.find(id)? {
            Some(entry) => read_log(&entry.path).map(Some),
            None => Ok(None),
        }
    }

    /// Deletes one crash log by id, returning whether it existed.
    pub fn delete(&self, id: &CrashLogId) -> Result<bool, StoreError> {
        match self.find(id)? {
            Some(entry) => {
                remove_if_present(&entry.path)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Deletes every stored crash log, returning how many were removed.
    pub fn delete_all(&self) -> Result<usize, StoreError> {
        let mut count = 0;
        for entry in self.entries()? {
            match fs::remove_file(&entry.path) {
                Ok(()) => count += 1,
                Err(e) => warn!(path = %entry.path.display(), error = %e, "Failed to delete crash log"),
            }
        }
        Ok(count)
    }

    fn find(&self, id: &CrashLogId) -> Result<Option<CrashLogEntry>, StoreError> {
        Ok(self.entries()?.into_iter().find(|entry| entry.id == *id))
    }

    fn path_for(&self, crash_log: &CrashLog) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(crash_log)))
    }
}

impl TelemetryStorage for FileCrashLogStore {
    fn get_all_crash_logs(&self) -> anyhow::Result<Vec<CrashLog>> {
        let mut logs = Vec::new();
        for entry in self.entries()? {
            match read_log(&entry.path) {
                Ok(log) => logs.push(log),
                Err(e) => warn!(error = %e, "Skipping unreadable crash log"),
            }
        }
        Ok(logs)
    }

    fn save_crash_log(&self, crash_log: &CrashLog) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;

        let path = self.path_for(crash_log);
        let tmp_path = path.with_extension("json.tmp");
        let content = serde_json::to_vec_pretty(crash_log).map_err(|e| {
            StoreError::Serialization {
                path: path.clone(),
                source: e,
            }
        })?;

        fs::write(&tmp_path, content).map_err(|e| StoreError::io(&tmp_path, e))?;
        fs::rename(&tmp_path, &path).map_err(|e| StoreError::io(&path, e))?;

        debug!(crash_log_id = %crash_log.id(), path = %path.display(), "Crash log written");
        Ok(())
    }

    fn delete_crash_log(&self, crash_log: &CrashLog) -> anyhow::Result<()> {
        let path = self.path_for(crash_log);
        if path.exists() {
            remove_if_present(&path)?;
        } else {
            self.delete(crash_log.id())?;
        }
        Ok(())
    }
}

fn file_stem(crash_log: &CrashLog) -> String {
    let prefix = if crash_log.is_fatal() {
        FATAL_PREFIX
    } else {
        NON_FATAL_PREFIX
    };
    format!(
        "{prefix}-{}-{}",
        crash_log.timestamp().format("%Y%m%d"),
        crash_log.id()
    )
}

/// Parse a file stem like `crash-20260207-<uuid>` into (fatal, date, id).
fn parse_file_stem(stem: &str) -> Result<(bool, String, CrashLogId), StoreError> {
    let invalid = || StoreError::InvalidFileName(stem.to_string());

    let mut parts = stem.splitn(3, '-');
    let fatal = match parts.next() {
        Some(FATAL_PREFIX) => true,
        Some(NON_FATAL_PREFIX) => false,
        _ => return Err(invalid()),
    };
    let date = parts.next().ok_or_else(invalid)?;
    let id = parts
        .next()
        .and_then(|id| id.parse::<CrashLogId>().ok())
        .ok_or_else(invalid)?;

    Ok((fatal, date.to_string(), id))
}

fn read_log(path: &Path) -> Result<CrashLog, StoreError> {
    let content = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| StoreError::Serialization {
        path: path.to_path_buf(),
        source: e,
    })
}

fn remove_if_present(path: &Path) -> Result<(), StoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

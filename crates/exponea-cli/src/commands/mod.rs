pub mod config;
pub mod crashes;

use std::path::PathBuf;

use exponea_core::config::Config;
use exponea_telemetry::FileCrashLogStore;

use crate::output::OutputFormat;

/// Settings shared by every command
pub struct CliContext {
    pub format: OutputFormat,
    /// Where the configuration was (or would have been) loaded from
    pub config_path: PathBuf,
    /// Loaded configuration, defaults if the file was missing or invalid
    pub config: Config,
}

impl CliContext {
    pub fn store(&self) -> FileCrashLogStore {
        FileCrashLogStore::new(self.config.telemetry.storage_dir.clone())
    }
}

//! Configuration module for Exponea crash telemetry.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for crash telemetry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub telemetry: TelemetryConfig,
    pub upload: UploadConfig,
    pub anonymize: AnonymizeConfig,
    pub logging: LoggingConfig,
}

/// Crash capture and local retention settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Directory holding crash logs that are waiting to be uploaded.
    pub storage_dir: PathBuf,
    /// Substrings identifying stack frames that belong to the SDK.
    pub sdk_markers: Vec<String>,
    /// Stored logs older than this many days are evicted without upload.
    pub max_log_age_days: u32,
    /// Upper bound on stored logs; the oldest beyond it are evicted.
    pub max_stored_logs: u32,
}

/// Remote collector settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// URL crash logs are POSTed to.
    pub endpoint: String,
    /// Project token sent with every payload. `None` until the host sets one.
    pub project_token: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

/// PII stripping applied to crash logs before upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnonymizeConfig {
    /// Replace the home directory with `<HOME>`.
    pub strip_paths: bool,
    /// Replace the current user name with `<USER>`.
    pub strip_usernames: bool,
    /// Replace file names inside paths with `<FILE>.ext`.
    pub strip_filenames: bool,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/exponea/telemetry.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("exponea")
            .join("telemetry.yaml")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Frame markers used when the configuration does not name any.
pub const DEFAULT_SDK_MARKERS: &[&str] = &["ExponeaSDK", "exponea_"];

/// Default collector endpoint.
pub const DEFAULT_UPLOAD_ENDPOINT: &str = "https://api.exponea.com/telemetry/crashes";

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            storage_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("~/.local/share"))
                .join("exponea")
                .join("crashes"),
            sdk_markers: DEFAULT_SDK_MARKERS.iter().map(|m| m.to_string()).collect(),
            max_log_age_days: 30,
            max_stored_logs: 50,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_UPLOAD_ENDPOINT.to_string(),
            project_token: None,
            timeout_secs: 10,
        }
    }
}

impl Default for AnonymizeConfig {
    fn default() -> Self {
        Self {
            strip_paths: true,
            strip_usernames: true,
            strip_filenames: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"upload.timeout_secs"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- telemetry ---
        if self.telemetry.sdk_markers.is_empty() {
            errors.push(ValidationError {
                field: "telemetry.sdk_markers".into(),
                message: "must name at least one marker".into(),
            });
        }
        if self.telemetry.sdk_markers.iter().any(|m| m.trim().is_empty()) {
            errors.push(ValidationError {
                field: "telemetry.sdk_markers".into(),
                message: "markers must not be blank".into(),
            });
        }
        if self.telemetry.max_log_age_days == 0 {
            errors.push(ValidationError {
                field: "telemetry.max_log_age_days".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.telemetry.max_stored_logs == 0 {
            errors.push(ValidationError {
                field: "telemetry.max_stored_logs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- upload ---
        let endpoint = self.upload.endpoint.as_str();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            errors.push(ValidationError {
                field: "upload.endpoint".into(),
                message: format!("must be an http(s) URL, got '{endpoint}'"),
            });
        }
        if self.upload.timeout_secs == 0 {
            errors.push(ValidationError {
                field: "upload.timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        if matches!(&self.upload.project_token, Some(token) if token.trim().is_empty()) {
            errors.push(ValidationError {
                field: "upload.project_token".into(),
                message: "must not be blank when set".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use exponea_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .telemetry_storage_dir(PathBuf::from("/var/lib/app/crashes"))
///     .upload_project_token("my-project-token")
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- telemetry ---

    pub fn telemetry_storage_dir(mut self, dir: PathBuf) -> Self {
        self.config.telemetry.storage_dir = dir;
        self
    }

    pub fn telemetry_sdk_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.telemetry.sdk_markers = markers.into_iter().map(Into::into).collect();
        self
    }

    pub fn telemetry_max_log_age_days(mut self, days: u32) -> Self {
        self.config.telemetry.max_log_age_days = days;
        self
    }

    pub fn telemetry_max_stored_logs(mut self, n: u32) -> Self {
        self.config.telemetry.max_stored_logs = n;
        self
    }

    // --- upload ---

    pub fn upload_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.upload.endpoint = endpoint.into();
        self
    }

    pub fn upload_project_token(mut self, token: impl Into<String>) -> Self {
        self.config.upload.project_token = Some(token.into());
        self
    }

    pub fn upload_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.upload.timeout_secs = seconds;
        self
    }

    // --- anonymize ---

    pub fn anonymize_strip_paths(mut self, enabled: bool) -> Self {
        self.config.anonymize.strip_paths = enabled;
        self
    }

    pub fn anonymize_strip_usernames(mut self, enabled: bool) -> Self {
        self.config.anonymize.strip_usernames = enabled;
        self
    }

    pub fn anonymize_strip_filenames(mut self, enabled: bool) -> Self {
        self.config.anonymize.strip_filenames = enabled;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//! Config command - Inspect the telemetry configuration
//!
//! Provides the `exponea-crashes config` subcommands which:
//! 1. Show the effective configuration (YAML or JSON)
//! 2. Print the configuration file path
//! 3. Validate the configuration file and report errors

use anyhow::{Context, Result};
use clap::Subcommand;
use exponea_core::config::Config;
use tracing::info;

use super::CliContext;
use crate::output::get_formatter;

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,
    /// Print the configuration file path
    Path,
    /// Validate the configuration file
    Validate,
}

impl ConfigCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        match self {
            ConfigCommand::Show => execute_show(ctx),
            ConfigCommand::Path => execute_path(ctx),
            ConfigCommand::Validate => execute_validate(ctx),
        }
    }
}

fn execute_show(ctx: &CliContext) -> Result<()> {
    let formatter = get_formatter(ctx.format);
    info!(config_path = %ctx.config_path.display(), "Showing configuration");

    if ctx.format.is_json() {
        let json =
            serde_json::to_value(&ctx.config).context("Failed to serialize configuration to JSON")?;
        formatter.print_json(&json);
    } else {
        formatter.success(&format!("Configuration ({})", ctx.config_path.display()));
        formatter.info("");

        let yaml = serde_yaml::to_string(&ctx.config)
            .context("Failed to serialize configuration to YAML")?;
        for line in yaml.lines() {
            formatter.info(line);
        }
    }

    Ok(())
}

fn execute_path(ctx: &CliContext) -> Result<()> {
    if ctx.format.is_json() {
        get_formatter(ctx.format).print_json(&serde_json::json!({
            "config_path": ctx.config_path.display().to_string(),
            "exists": ctx.config_path.exists(),
        }));
    } else {
        println!("{}", ctx.config_path.display());
    }
    Ok(())
}

fn execute_validate(ctx: &CliContext) -> Result<()> {
    let formatter = get_formatter(ctx.format);
    let config_path = &ctx.config_path;

    // Load explicitly: a broken file must be reported, not replaced by defaults
    let config = match Config::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            let message = if config_path.exists() {
                format!("Failed to parse configuration: {e}")
            } else {
                "Configuration file not found. Using defaults.".to_string()
            };

            if ctx.format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "valid": false,
                    "config_path": config_path.display().to_string(),
                    "errors": [message],
                }));
            } else {
                formatter.error(&message);
                formatter.info(&format!("File: {}", config_path.display()));
            }
            return Ok(());
        }
    };

    info!(config_path = %config_path.display(), "Validating configuration");
    let errors = config.validate();

    if ctx.format.is_json() {
        let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        formatter.print_json(&serde_json::json!({
            "valid": errors.is_empty(),
            "config_path": config_path.display().to_string(),
            "errors": error_strings,
        }));
    } else if errors.is_empty() {
        formatter.success("Configuration is valid");
        formatter.info(&format!("File: {}", config_path.display()));
    } else {
        formatter.error(&format!(
            "Configuration has {} error{}:",
            errors.len(),
            if errors.len() == 1 { "" } else { "s" }
        ));
        formatter.info(&format!("File: {}", config_path.display()));
        formatter.info("");
        for error in &errors {
            formatter.info(&format!("  {} - {}", error.field, error.message));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;

    fn context(config_path: std::path::PathBuf) -> CliContext {
        CliContext {
            format: OutputFormat::Json,
            config: Config::load_or_default(&config_path),
            config_path,
        }
    }

    #[test]
    fn test_validate_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path().join("telemetry.yaml"));
        assert!(execute_validate(&ctx).is_ok());
    }

    #[test]
    fn test_validate_broken_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("telemetry.yaml");
        std::fs::write(&path, "telemetry: [not, a, map").unwrap();

        let ctx = context(path);
        assert_eq!(ctx.config, Config::default());
        assert!(execute_validate(&ctx).is_ok());
    }

    #[test]
    fn test_store_uses_configured_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("telemetry.yaml");
        let crashes = dir.path().join("crashes");
        std::fs::write(
            &path,
            format!("telemetry:\n  storage_dir: {}\n", crashes.display()),
        )
        .unwrap();

        let ctx = context(path);
        assert_eq!(ctx.store().dir(), crashes.as_path());
        assert!(execute_show(&ctx).is_ok());
        assert!(execute_path(&ctx).is_ok());
    }
}
